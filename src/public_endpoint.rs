use crate::{config::PublicEndpoint, storage::media::MediaRef};

/// returns the url a player can fetch the blob from
pub fn get_media_url(conf: &PublicEndpoint, media: &MediaRef) -> String {
    let url = &conf.base_url.trim_end_matches('/');
    format!("{url}/media/{}/{}", media.kind.as_str(), media.id)
}

/// Turns a stored audio or cover location into something playable.
///
/// Media references become server urls, anything else is already a url and is kept.
/// Malformed references resolve to `None`.
pub fn resolve_location(conf: &PublicEndpoint, location: &str) -> Option<String> {
    if !MediaRef::is_reference(location) {
        return Some(location.to_string());
    }
    match location.parse::<MediaRef>() {
        Ok(media) => Some(get_media_url(conf, &media)),
        Err(e) => {
            log::warn!("{e}");
            None
        }
    }
}
