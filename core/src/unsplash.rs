use serde::Deserialize;

use crate::models::{FoodImage, ImageCredit, ImagePreview};

pub const PREVIEW_COUNT: u32 = 6;
pub const MAX_CREDIT_NAME_LEN: usize = 120;
pub const SOURCE: &str = "Unsplash";

const REFERRAL: &str = "utm_source=fullsnack&utm_medium=referral";

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
pub struct Photo {
    pub id: Option<String>,
    pub alt_description: Option<String>,
    #[serde(default)]
    pub urls: PhotoUrls,
    pub user: Option<Photographer>,
    #[serde(default)]
    pub links: Links,
}

#[derive(Debug, Default, Deserialize)]
pub struct PhotoUrls {
    pub thumb: Option<String>,
    pub small: Option<String>,
    pub regular: Option<String>,
    pub full: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Photographer {
    pub name: Option<String>,
    #[serde(default)]
    pub links: Links,
}

#[derive(Debug, Default, Deserialize)]
pub struct Links {
    pub html: Option<String>,
}

impl Photo {
    fn photographer_name(&self) -> Option<&str> {
        self.user.as_ref().and_then(|u| u.name.as_deref())
    }

    fn photographer_profile(&self) -> Option<&str> {
        self.user.as_ref().and_then(|u| u.links.html.as_deref())
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn with_referral(link: &str) -> String {
    let sep = if link.contains('?') { '&' } else { '?' };
    format!("{link}{sep}{REFERRAL}")
}

#[must_use]
pub fn to_preview(photo: Photo, query: &str) -> ImagePreview {
    let credit = ImageCredit {
        name: photo.photographer_name().map(str::to_string),
        profile: photo.photographer_profile().map(str::to_string),
        photo: photo.links.html.clone(),
    };
    ImagePreview {
        id: photo.id,
        alt: photo
            .alt_description
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| query.to_string()),
        thumb: photo.urls.thumb,
        full: photo.urls.regular.or(photo.urls.full),
        credit,
    }
}

/// Image metadata to store on an entry. `None` when the photo has no usable URL.
#[must_use]
pub fn to_food_image(photo: &Photo) -> Option<FoodImage> {
    let url = photo
        .urls
        .regular
        .as_deref()
        .or(photo.urls.full.as_deref())
        .or(photo.urls.small.as_deref())?;

    let credit_name = non_empty(photo.photographer_name())
        .map(|name| name.chars().take(MAX_CREDIT_NAME_LEN).collect::<String>());

    Some(FoodImage {
        url: url.to_string(),
        credit_name,
        credit_profile: non_empty(photo.photographer_profile()).map(with_referral),
        credit_photo: non_empty(photo.links.html.as_deref()).map(with_referral),
        source: Some(SOURCE.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Vec<Photo> {
        serde_json::from_str::<SearchResponse>(json).unwrap().results
    }

    const SAMPLE: &str = r#"{"results": [{
        "id": "abc123",
        "alt_description": "bowl of ramen",
        "urls": {
            "thumb": "https://img/thumb.jpg",
            "small": "https://img/small.jpg",
            "regular": "https://img/regular.jpg",
            "full": "https://img/full.jpg"
        },
        "user": {"name": "Jo Photographer", "links": {"html": "https://unsplash.com/@jo"}},
        "links": {"html": "https://unsplash.com/photos/abc123"}
    }]}"#;

    #[test]
    fn test_to_preview() {
        let photo = parse(SAMPLE).remove(0);
        let preview = to_preview(photo, "ramen");
        assert_eq!(preview.id.as_deref(), Some("abc123"));
        assert_eq!(preview.alt, "bowl of ramen");
        assert_eq!(preview.thumb.as_deref(), Some("https://img/thumb.jpg"));
        assert_eq!(preview.full.as_deref(), Some("https://img/regular.jpg"));
        assert_eq!(preview.credit.name.as_deref(), Some("Jo Photographer"));
        assert_eq!(
            preview.credit.photo.as_deref(),
            Some("https://unsplash.com/photos/abc123")
        );
    }

    #[test]
    fn test_preview_credit_wire_names() {
        let preview = to_preview(parse(SAMPLE).remove(0), "ramen");
        let json = serde_json::to_value(&preview).unwrap();
        assert_eq!(json["credit"]["name"], "Jo Photographer");
        assert_eq!(json["credit"]["profile"], "https://unsplash.com/@jo");
        assert_eq!(
            json["credit"]["unsplash"],
            "https://unsplash.com/photos/abc123"
        );
        assert!(json["credit"].get("photo").is_none());
    }

    #[test]
    fn test_to_preview_alt_falls_back_to_query() {
        let photo = parse(r#"{"results": [{"id": "x", "urls": {"full": "https://img/f.jpg"}}]}"#)
            .remove(0);
        let preview = to_preview(photo, "tacos");
        assert_eq!(preview.alt, "tacos");
        assert_eq!(preview.full.as_deref(), Some("https://img/f.jpg"));
        assert!(preview.credit.name.is_none());
    }

    #[test]
    fn test_to_food_image() {
        let photos = parse(SAMPLE);
        let image = to_food_image(&photos[0]).unwrap();
        assert_eq!(image.url, "https://img/regular.jpg");
        assert_eq!(image.credit_name.as_deref(), Some("Jo Photographer"));
        assert_eq!(
            image.credit_profile.as_deref(),
            Some("https://unsplash.com/@jo?utm_source=fullsnack&utm_medium=referral")
        );
        assert_eq!(
            image.credit_photo.as_deref(),
            Some("https://unsplash.com/photos/abc123?utm_source=fullsnack&utm_medium=referral")
        );
        assert_eq!(image.source.as_deref(), Some("Unsplash"));
    }

    #[test]
    fn test_to_food_image_url_fallbacks() {
        let photos = parse(
            r#"{"results": [
                {"urls": {"small": "https://img/s.jpg", "full": "https://img/f.jpg"}},
                {"urls": {"small": "https://img/s.jpg"}},
                {"urls": {"thumb": "https://img/t.jpg"}}
            ]}"#,
        );
        assert_eq!(to_food_image(&photos[0]).unwrap().url, "https://img/f.jpg");
        assert_eq!(to_food_image(&photos[1]).unwrap().url, "https://img/s.jpg");
        assert!(to_food_image(&photos[2]).is_none());
    }

    #[test]
    fn test_credit_name_truncated() {
        let long = "N".repeat(200);
        let json = format!(
            r#"{{"results": [{{"urls": {{"regular": "https://img/r.jpg"}}, "user": {{"name": "{long}"}}}}]}}"#
        );
        let photos = parse(&json);
        let image = to_food_image(&photos[0]).unwrap();
        assert_eq!(image.credit_name.unwrap().chars().count(), MAX_CREDIT_NAME_LEN);
        assert!(image.credit_profile.is_none());
        assert!(image.credit_photo.is_none());
    }
}
