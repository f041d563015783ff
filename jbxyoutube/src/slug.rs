//! Reconnaissance des identifiants de vidéo YouTube

use reqwest::Url;

/// Longueur d'un identifiant de vidéo
const SLUG_LEN: usize = 11;

/// URL de lecture d'une vidéo
pub fn watch_url(slug: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", slug)
}

/// Vrai si `s` a la forme d'un identifiant de vidéo (11 caractères `[A-Za-z0-9_-]`)
pub fn is_slug(s: &str) -> bool {
    s.len() == SLUG_LEN
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Extrait l'identifiant d'une requête utilisateur
///
/// Accepte un identifiant nu ou une URL `watch?v=`, `youtu.be/`, `embed/`,
/// `shorts/` ou `live/`.
pub fn parse_slug(input: &str) -> Option<String> {
    let input = input.trim();
    if is_slug(input) {
        return Some(input.to_string());
    }

    let url = Url::parse(input)
        .or_else(|_| Url::parse(&format!("https://{}", input)))
        .ok()?;
    let host = url.host_str()?.trim_start_matches("www.").trim_start_matches("m.");

    let candidate = match host {
        "youtu.be" => url.path_segments()?.next().map(str::to_string),
        "youtube.com" | "music.youtube.com" | "youtube-nocookie.com" => {
            let mut segments = url.path_segments()?;
            match segments.next() {
                Some("watch") => url
                    .query_pairs()
                    .find(|(k, _)| k == "v")
                    .map(|(_, v)| v.into_owned()),
                Some("embed" | "shorts" | "live" | "v") => segments.next().map(str::to_string),
                _ => None,
            }
        }
        _ => None,
    };

    candidate.filter(|slug| is_slug(slug))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_slug() {
        assert_eq!(parse_slug("dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(parse_slug("  dQw4w9WgXcQ ").as_deref(), Some("dQw4w9WgXcQ"));
        assert!(parse_slug("daft punk").is_none());
        assert!(parse_slug("dQw4w9WgXc").is_none());
    }

    #[test]
    fn test_urls() {
        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtube.com/watch?list=PL123&v=dQw4w9WgXcQ&t=42",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://music.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ?t=10",
            "youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
        ] {
            assert_eq!(parse_slug(url).as_deref(), Some("dQw4w9WgXcQ"), "{}", url);
        }
    }

    #[test]
    fn test_rejected_urls() {
        assert!(parse_slug("https://vimeo.com/watch?v=dQw4w9WgXcQ").is_none());
        assert!(parse_slug("https://www.youtube.com/watch?v=short").is_none());
        assert!(parse_slug("https://www.youtube.com/channel/UC1234567890").is_none());
    }

    #[test]
    fn test_watch_url() {
        assert_eq!(watch_url("abc"), "https://www.youtube.com/watch?v=abc");
    }
}
