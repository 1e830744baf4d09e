//! 附件编解码服务 - 业务能力层
//!
//! 二进制图片 ⇄ data URL。草稿整体写成一份 JSON，图片必须先转成文本。

use base64::{engine::general_purpose, Engine as _};
use thiserror::Error;

use crate::models::{Attachment, EncodedImage, QuestionPaperDraft, Question, QuestionBody, RawImage};

/// 附件编解码错误
#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("附件已经是编码形式")]
    AlreadyEncoded,
    #[error("附件尚未编码")]
    NotEncoded,
    #[error("无法识别的 data URL: {0}")]
    MalformedDataUrl(String),
    #[error("base64 解码失败: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("附件大小不符: 记录 {expected} 字节, 实际 {actual} 字节")]
    SizeMismatch { expected: u64, actual: u64 },
}

/// Raw → Encoded
pub fn encode(attachment: &Attachment) -> Result<EncodedImage, AttachmentError> {
    match attachment {
        Attachment::Encoded(_) => Err(AttachmentError::AlreadyEncoded),
        Attachment::Raw(raw) => Ok(EncodedImage {
            data: format!(
                "data:{};base64,{}",
                raw.mime,
                general_purpose::STANDARD.encode(&raw.bytes)
            ),
            name: raw.name.clone(),
            mime: raw.mime.clone(),
            size: raw.size(),
        }),
    }
}

/// Encoded → Raw
pub fn decode(attachment: &Attachment) -> Result<RawImage, AttachmentError> {
    match attachment {
        Attachment::Raw(_) => Err(AttachmentError::NotEncoded),
        Attachment::Encoded(encoded) => decode_image(encoded),
    }
}

/// 不管当前是哪种形式，取出二进制内容（提交时用）
pub fn to_raw(attachment: &Attachment) -> Result<RawImage, AttachmentError> {
    match attachment {
        Attachment::Raw(raw) => Ok(raw.clone()),
        Attachment::Encoded(encoded) => decode_image(encoded),
    }
}

fn decode_image(encoded: &EncodedImage) -> Result<RawImage, AttachmentError> {
    let payload = encoded
        .data
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"))
        .map(|(_, payload)| payload)
        .ok_or_else(|| AttachmentError::MalformedDataUrl(preview(&encoded.data)))?;

    let bytes = general_purpose::STANDARD.decode(payload)?;
    let actual = bytes.len() as u64;
    if actual != encoded.size {
        return Err(AttachmentError::SizeMismatch {
            expected: encoded.size,
            actual,
        });
    }

    Ok(RawImage {
        bytes,
        name: encoded.name.clone(),
        mime: encoded.mime.clone(),
    })
}

fn preview(data: &str) -> String {
    data.chars().take(32).collect()
}

/// 把草稿中所有 Raw 附件编码（保存前调用），已编码的保持不变
pub fn encode_draft(draft: &mut QuestionPaperDraft) -> Result<usize, AttachmentError> {
    convert_draft(draft, |attachment| match attachment {
        Attachment::Raw(_) => encode(attachment).map(|e| Some(Attachment::Encoded(e))),
        Attachment::Encoded(_) => Ok(None),
    })
}

/// 把草稿中所有 Encoded 附件解码（加载后调用）
pub fn decode_draft(draft: &mut QuestionPaperDraft) -> Result<usize, AttachmentError> {
    convert_draft(draft, |attachment| match attachment {
        Attachment::Encoded(_) => decode(attachment).map(|r| Some(Attachment::Raw(r))),
        Attachment::Raw(_) => Ok(None),
    })
}

/// 遍历所有附件槽位，返回被替换的数量
fn convert_draft<F>(draft: &mut QuestionPaperDraft, mut convert: F) -> Result<usize, AttachmentError>
where
    F: FnMut(&Attachment) -> Result<Option<Attachment>, AttachmentError>,
{
    let mut converted = 0;
    let questions = draft
        .modules
        .iter_mut()
        .flat_map(|m| m.questions.iter_mut())
        .chain(draft.mba_questions.iter_mut());

    for question in questions {
        for slot in attachment_slots(question) {
            if let Some(current) = slot.as_ref() {
                if let Some(replacement) = convert(current)? {
                    *slot = Some(replacement);
                    converted += 1;
                }
            }
        }
    }
    Ok(converted)
}

fn attachment_slots(question: &mut Question) -> Vec<&mut Option<Attachment>> {
    let mut slots = vec![&mut question.image];
    if let QuestionBody::Split { sub_questions } = &mut question.body {
        slots.extend(sub_questions.iter_mut().map(|sub| &mut sub.image));
    }
    slots
}
