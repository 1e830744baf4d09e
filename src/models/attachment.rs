use serde::{Deserialize, Serialize};

/// 尚未持久化的图片（用户刚选择的二进制文件）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    pub bytes: Vec<u8>,
    pub name: String,
    pub mime: String,
}

impl RawImage {
    pub fn new(bytes: impl Into<Vec<u8>>, name: impl Into<String>, mime: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            name: name.into(),
            mime: mime.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// 已编码的图片，可以安全地写入 JSON
///
/// `data` 是 `data:<mime>;base64,<payload>` 形式的 data URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedImage {
    pub data: String,
    pub name: String,
    #[serde(rename = "type")]
    pub mime: String,
    pub size: u64,
}

/// 题目或小题上的图片附件
///
/// 二者互斥：保存时 Raw → Encoded，加载时 Encoded → Raw。
/// Raw 不参与序列化，写盘前必须先编码。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Attachment {
    #[serde(skip)]
    Raw(RawImage),
    Encoded(EncodedImage),
}

impl Attachment {
    pub fn is_encoded(&self) -> bool {
        matches!(self, Attachment::Encoded(_))
    }

    pub fn name(&self) -> &str {
        match self {
            Attachment::Raw(raw) => &raw.name,
            Attachment::Encoded(encoded) => &encoded.name,
        }
    }
}

impl From<RawImage> for Attachment {
    fn from(raw: RawImage) -> Self {
        Attachment::Raw(raw)
    }
}

impl From<EncodedImage> for Attachment {
    fn from(encoded: EncodedImage) -> Self {
        Attachment::Encoded(encoded)
    }
}
