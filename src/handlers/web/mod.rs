// handlers/web/mod.rs - browser-facing routes
//
// Every route here except the login ones sits behind `require_session`, which
// puts the signed-in `Subject` into request extensions. Capability checks go
// to the realm on each request.

pub mod actions;
pub mod backup;
pub mod index;
pub mod login;
pub mod page;

use url::Url;

/// Path of the wiki page called `name`, percent-encoded as one segment
pub fn page_location(name: &str) -> String {
    let Ok(mut url) = Url::parse("http://localhost/wiki/") else {
        return "/".to_string();
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(name);
    }
    url.path().to_string()
}
