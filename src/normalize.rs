//! Response normalization, one adapter per endpoint.
//!
//! Platform responses are inconsistent across endpoints: ids arrive as strings
//! or numbers, lists sit under `list`, `identity_list`, `pixels` or at the top
//! level, and media ids are named `image_id`, `video_id` or `id`. Each adapter
//! maps those shapes onto one canonical type. Anything it cannot map becomes a
//! `RemoteRejected` error.

use crate::draft::{MediaKind, MediaRef};
use crate::error::{CampaignError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Code used for responses that succeeded but could not be normalized.
pub const SHAPE_MISMATCH_CODE: i64 = -1;

/// Publishing persona shown alongside an ad.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub identity_id: String,
    pub identity_type: String,
    pub display_name: String,
}

/// Conversion tracking entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pixel {
    pub pixel_id: String,
    pub pixel_name: String,
}

fn shape_error(endpoint: &str, detail: impl std::fmt::Display) -> CampaignError {
    CampaignError::from_api_response(
        SHAPE_MISMATCH_CODE,
        format!("Unexpected {endpoint} response: {detail}"),
    )
}

/// Reads an id that may be encoded as a string or a number.
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_id(data: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| data.get(*k).and_then(id_string))
}

fn first_str(item: &Value, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|k| item.get(*k).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}

/// Finds the list in `data`: the first array under `keys`, or `data` itself.
fn list<'a>(data: &'a Value, keys: &[&str]) -> Option<&'a Vec<Value>> {
    if let Some(items) = data.as_array() {
        return Some(items);
    }
    keys.iter().find_map(|k| data.get(*k).and_then(Value::as_array))
}

pub fn campaign_id(data: &Value) -> Result<String> {
    first_id(data, &["campaign_id", "id"])
        .ok_or_else(|| shape_error("campaign", "missing campaign_id"))
}

pub fn adgroup_id(data: &Value) -> Result<String> {
    first_id(data, &["adgroup_id", "ad_group_id", "id"])
        .ok_or_else(|| shape_error("adgroup", "missing adgroup_id"))
}

/// Ad ids from `ad_ids`, `ad_id` or `creatives[].ad_id`, in response order.
pub fn ad_ids(data: &Value) -> Result<Vec<String>> {
    let mut ids: Vec<String> = data
        .get("ad_ids")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(id_string).collect())
        .unwrap_or_default();

    if ids.is_empty() {
        if let Some(id) = data.get("ad_id").and_then(id_string) {
            ids.push(id);
        }
    }

    if ids.is_empty() {
        if let Some(creatives) = data.get("creatives").and_then(Value::as_array) {
            ids.extend(creatives.iter().filter_map(|c| c.get("ad_id").and_then(id_string)));
        }
    }

    if ids.is_empty() {
        return Err(shape_error("ad", "no ad ids returned"));
    }
    Ok(ids)
}

/// Ids confirmed by a status update. Falls back to the requested ids when the
/// platform acknowledges without echoing them.
pub fn status_update(data: &Value, requested: &[String]) -> Result<Vec<String>> {
    match data.get("ad_ids").and_then(Value::as_array) {
        Some(items) => Ok(items.iter().filter_map(id_string).collect()),
        None if data.is_null() || data.is_object() => Ok(requested.to_vec()),
        None => Err(shape_error("status update", "data is not an object")),
    }
}

pub fn identities(data: &Value) -> Result<Vec<Identity>> {
    let items = list(data, &["identity_list", "list"])
        .ok_or_else(|| shape_error("identity", "missing identity list"))?;
    items
        .iter()
        .map(|item| {
            let identity_id = first_id(item, &["identity_id", "id"])
                .ok_or_else(|| shape_error("identity", "entry without identity_id"))?;
            Ok(Identity {
                identity_id,
                identity_type: first_str(item, &["identity_type"]),
                display_name: first_str(item, &["display_name", "name"]),
            })
        })
        .collect()
}

pub fn pixels(data: &Value) -> Result<Vec<Pixel>> {
    let items = list(data, &["pixels", "list"])
        .ok_or_else(|| shape_error("pixel", "missing pixel list"))?;
    items
        .iter()
        .map(|item| {
            let pixel_id = first_id(item, &["pixel_id", "id"])
                .ok_or_else(|| shape_error("pixel", "entry without pixel_id"))?;
            Ok(Pixel {
                pixel_id,
                pixel_name: first_str(item, &["pixel_name", "name"]),
            })
        })
        .collect()
}

/// Media library entries of one kind, tagged and attributed to `account_id`.
pub fn media(data: &Value, kind: MediaKind, account_id: &str) -> Result<Vec<MediaRef>> {
    const IMAGE_IDS: &[&str] = &["image_id", "id"];
    const IMAGE_URLS: &[&str] = &["image_url", "url"];
    const VIDEO_IDS: &[&str] = &["video_id", "id"];
    const VIDEO_URLS: &[&str] = &["preview_url", "video_cover_url", "url"];

    let (endpoint, id_keys, url_keys) = match kind {
        MediaKind::Image => ("image", IMAGE_IDS, IMAGE_URLS),
        MediaKind::Video => ("video", VIDEO_IDS, VIDEO_URLS),
    };

    let items = list(data, &["list", "items"])
        .ok_or_else(|| shape_error(endpoint, "missing media list"))?;
    items
        .iter()
        .map(|item| {
            let media_id = first_id(item, id_keys)
                .ok_or_else(|| shape_error(endpoint, "entry without media id"))?;
            let mut media = MediaRef::new(media_id, kind, first_str(item, url_keys), account_id);
            let file_name = first_str(item, &["file_name", "material_name"]);
            media.file_name = (!file_name.is_empty()).then_some(file_name);
            Ok(media)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ids_as_numbers_or_strings() {
        assert_eq!(campaign_id(&json!({"campaign_id": 1800})).unwrap(), "1800");
        assert_eq!(campaign_id(&json!({"campaign_id": "1800"})).unwrap(), "1800");
        assert_eq!(adgroup_id(&json!({"adgroup_id": "g-1"})).unwrap(), "g-1");
        assert!(campaign_id(&json!({"campaign_id": ""})).is_err());
        assert!(adgroup_id(&json!([])).unwrap_err().is_remote_rejection());
    }

    #[test]
    fn test_ad_ids_shapes() {
        assert_eq!(ad_ids(&json!({"ad_ids": ["1", 2]})).unwrap(), vec!["1", "2"]);
        assert_eq!(ad_ids(&json!({"ad_id": 9})).unwrap(), vec!["9"]);
        assert_eq!(
            ad_ids(&json!({"creatives": [{"ad_id": "a"}, {"ad_id": "b"}]})).unwrap(),
            vec!["a", "b"]
        );
        assert!(ad_ids(&json!({"ad_ids": []})).is_err());
    }

    #[test]
    fn test_status_update_falls_back_to_requested() {
        let requested = vec!["a".to_string()];
        assert_eq!(status_update(&Value::Null, &requested).unwrap(), requested);
        assert_eq!(
            status_update(&json!({"ad_ids": ["a", "b"]}), &requested).unwrap(),
            vec!["a", "b"]
        );
        assert!(status_update(&json!("ok"), &requested).is_err());
    }

    #[test]
    fn test_identities_under_either_key() {
        let a = identities(&json!({"identity_list": [
            {"identity_id": "i1", "identity_type": "CUSTOMIZED_USER", "display_name": "Shop"}
        ]}))
        .unwrap();
        let b = identities(&json!({"list": [{"id": "i1", "name": "Shop"}]})).unwrap();
        assert_eq!(a[0].identity_id, b[0].identity_id);
        assert_eq!(b[0].display_name, "Shop");
        assert!(identities(&json!({"list": [{"name": "no id"}]})).is_err());
    }

    #[test]
    fn test_media_tagged_by_kind() {
        let images = media(
            &json!({"list": [{"image_id": "img1", "image_url": "https://i/1", "file_name": "a.png"}]}),
            MediaKind::Image,
            "7000",
        )
        .unwrap();
        assert_eq!(images[0].kind, MediaKind::Image);
        assert_eq!(images[0].file_name.as_deref(), Some("a.png"));
        assert_eq!(images[0].account_id, "7000");

        let videos = media(
            &json!([{"video_id": "v1", "preview_url": "https://v/1"}]),
            MediaKind::Video,
            "7000",
        )
        .unwrap();
        assert_eq!(videos[0].media_id, "v1");
        assert_eq!(videos[0].source_url, "https://v/1");
        assert_eq!(videos[0].file_name, None);
    }

    #[test]
    fn test_pixels() {
        let pixels = pixels(&json!({"pixels": [{"pixel_id": 55, "pixel_name": "Main"}]})).unwrap();
        assert_eq!(pixels[0].pixel_id, "55");
        assert!(super::pixels(&json!({"unexpected": true})).is_err());
    }
}
