//! Runtime font delivery. The controller hands the active theme's font names
//! to a [`FontLoader`]; nothing flows back into controller state.

use std::sync::{Arc, RwLock};

use reqwest::Url;
use tracing::{debug, warn};

const GOOGLE_FONTS_CSS: &str = "https://fonts.googleapis.com/css2";

pub trait FontLoader: Send + Sync {
    fn load(&self, fonts: &[&str]);
}

/// Stylesheet URL for a Google Fonts family, e.g. `Josefin Sans` becomes
/// `...?family=Josefin+Sans&display=swap`.
pub fn stylesheet_url(font: &str) -> Option<String> {
    Url::parse_with_params(GOOGLE_FONTS_CSS, &[("family", font.trim()), ("display", "swap")])
        .map(String::from)
        .map_err(|e| warn!(font, "Failed to build font stylesheet URL: {}", e))
        .ok()
}

/// Keeps the stylesheet links for the most recently loaded fonts so a page
/// renderer can emit `<link>` tags for them.
#[derive(Debug, Default, Clone)]
pub struct FontLinks {
    links: Arc<RwLock<Vec<String>>>,
}

impl FontLinks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stylesheets(&self) -> Vec<String> {
        match self.links.read() {
            Ok(links) => links.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl FontLoader for FontLinks {
    fn load(&self, fonts: &[&str]) {
        let mut urls: Vec<String> = Vec::with_capacity(fonts.len());
        for font in fonts.iter().filter(|f| !f.trim().is_empty()) {
            let Some(url) = stylesheet_url(font) else {
                continue;
            };
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
        debug!(?urls, "Loading fonts");
        match self.links.write() {
            Ok(mut links) => *links = urls,
            Err(poisoned) => *poisoned.into_inner() = urls,
        }
    }
}
