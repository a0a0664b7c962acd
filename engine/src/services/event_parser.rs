//! 弹幕流消息分类
//!
//! 原始消息是平台推送的 JSON:
//! - 弹幕 (`DANMU_MSG`): `data.info` 为定长数组,
//!   `info[1]` 是文本,`info[2]` 是 `[uid, 用户名, ...]`
//! - 礼物 (`SEND_GIFT`): `data.data` 为明细对象,
//!   含 `uname`、`giftName`、`num`
//!
//! 任何缺失字段都使整条消息被丢弃,不会产生事件。

use serde_json::Value;

use crate::models::{ClassifiedEvent, ParseError};
use crate::services::platform::{EVENT_DANMAKU, EVENT_GIFT};

/// 按事件类型分类一条原始消息
///
/// `self_uid` 为当前登录用户ID,用于标记自己发送的弹幕。
pub fn classify(
    event_type: &str,
    raw: &Value,
    self_uid: Option<&str>,
) -> Result<ClassifiedEvent, ParseError> {
    match event_type {
        EVENT_DANMAKU => parse_danmaku(raw, self_uid),
        EVENT_GIFT => parse_gift(raw),
        other => Err(ParseError::UnknownType(other.to_string())),
    }
}

fn parse_danmaku(raw: &Value, self_uid: Option<&str>) -> Result<ClassifiedEvent, ParseError> {
    let info = raw
        .pointer("/data/info")
        .and_then(Value::as_array)
        .ok_or(ParseError::MissingField("data.info"))?;

    let text = info
        .get(1)
        .ok_or(ParseError::MissingField("info[1]"))?
        .as_str()
        .ok_or(ParseError::InvalidField("info[1]"))?;

    let user = info
        .get(2)
        .ok_or(ParseError::MissingField("info[2]"))?
        .as_array()
        .ok_or(ParseError::InvalidField("info[2]"))?;

    let user_id = match user.first() {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(_) => return Err(ParseError::InvalidField("info[2][0]")),
        None => return Err(ParseError::MissingField("info[2][0]")),
    };

    let username = user
        .get(1)
        .ok_or(ParseError::MissingField("info[2][1]"))?
        .as_str()
        .ok_or(ParseError::InvalidField("info[2][1]"))?;

    let is_self = self_uid.is_some_and(|uid| !uid.is_empty() && uid == user_id);

    Ok(ClassifiedEvent::Danmaku {
        username: username.to_string(),
        user_id,
        text: text.to_string(),
        is_self,
    })
}

fn parse_gift(raw: &Value) -> Result<ClassifiedEvent, ParseError> {
    let detail = raw
        .pointer("/data/data")
        .filter(|v| v.is_object())
        .ok_or(ParseError::MissingField("data.data"))?;

    let username = required_str(detail, "uname")?;
    let gift_name = required_str(detail, "giftName")?;
    let count = detail
        .get("num")
        .ok_or(ParseError::MissingField("num"))?
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or(ParseError::InvalidField("num"))?;

    Ok(ClassifiedEvent::Gift {
        username: username.to_string(),
        gift_name: gift_name.to_string(),
        count,
    })
}

fn required_str<'a>(detail: &'a Value, field: &'static str) -> Result<&'a str, ParseError> {
    detail
        .get(field)
        .ok_or(ParseError::MissingField(field))?
        .as_str()
        .ok_or(ParseError::InvalidField(field))
}
