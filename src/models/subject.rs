use serde::{Deserialize, Serialize};

use crate::models::draft::SubjectInfo;

/// 分配给教师的出题科目（`GET /faculty/subject-codes/:email`）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedSubject {
    pub subject_code: String,
    pub subject_name: String,
    #[serde(deserialize_with = "deserialize_semester")]
    pub semester: u8,
    #[serde(default)]
    pub status: String,
}

impl AssignedSubject {
    /// 是否已经交过卷
    pub fn is_submitted(&self) -> bool {
        self.status.eq_ignore_ascii_case("submitted")
    }
}

impl From<&AssignedSubject> for SubjectInfo {
    fn from(subject: &AssignedSubject) -> Self {
        Self {
            code: subject.subject_code.clone(),
            name: subject.subject_name.clone(),
            semester: Some(subject.semester),
        }
    }
}

// 后端有时把学期存成字符串
fn deserialize_semester<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Visitor;
    use std::fmt;

    struct SemesterVisitor;

    impl<'de> Visitor<'de> for SemesterVisitor {
        type Value = u8;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or integer representing a semester")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            value
                .trim()
                .parse()
                .map_err(|_| E::invalid_value(serde::de::Unexpected::Str(value), &self))
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            u8::try_from(value)
                .map_err(|_| E::invalid_value(serde::de::Unexpected::Unsigned(value), &self))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            u8::try_from(value)
                .map_err(|_| E::invalid_value(serde::de::Unexpected::Signed(value), &self))
        }
    }

    deserializer.deserialize_any(SemesterVisitor)
}
