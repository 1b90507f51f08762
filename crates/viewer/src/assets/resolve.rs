//! Model reference → ordered candidate URLs

use shared::Patient;

use crate::state::ViewerSettings;

/// `http://` or `https://`, case-insensitive
pub fn is_absolute_url(reference: &str) -> bool {
    let lower = reference
        .get(..8)
        .unwrap_or(reference)
        .to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Root-relative paths are kept; a bare name loses any leading `models/` and is placed
/// under `model_dir`.
pub fn normalize_path(reference: &str, model_dir: &str) -> String {
    if reference.starts_with('/') {
        return reference.to_string();
    }
    let name = reference.strip_prefix("models/").unwrap_or(reference);
    format!("{}/{}", model_dir.trim_end_matches('/'), name)
}

/// Candidate URLs for a model reference, in the order they should be tried
pub fn candidates(reference: &str, settings: &ViewerSettings) -> Vec<String> {
    let reference = reference.trim();
    let reference = if reference.is_empty() {
        settings.default_model.as_str()
    } else {
        reference
    };

    if is_absolute_url(reference) {
        return vec![reference.to_string()];
    }

    let path = normalize_path(reference, &settings.model_dir);
    let base = settings.api_base();
    vec![
        format!("{}{}", base, path),
        format!("{}{}{}", base, settings.legacy_prefix.trim_end_matches('/'), path),
    ]
}

/// Candidates for a patient, or for the default model when the patient is unknown
pub fn candidates_for(patient: Option<&Patient>, settings: &ViewerSettings) -> Vec<String> {
    let reference = patient.map(|p| p.model_url.as_str()).unwrap_or("");
    candidates(reference, settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ViewerSettings {
        ViewerSettings::default()
    }

    #[test]
    fn test_absolute_url_used_alone() {
        let c = candidates("HTTPS://cdn.example.org/h.glb", &settings());
        assert_eq!(c, vec!["HTTPS://cdn.example.org/h.glb"]);
        assert!(is_absolute_url("http://x"));
        assert!(!is_absolute_url("httpx://x"));
        assert!(!is_absolute_url("/http://x"));
    }

    #[test]
    fn test_root_relative_kept() {
        let c = candidates("/static/h.glb", &settings());
        assert_eq!(
            c,
            vec![
                "http://localhost:4000/static/h.glb",
                "http://localhost:4000/api/static/h.glb",
            ]
        );
    }

    #[test]
    fn test_bare_name_prefixed() {
        let c = candidates("heart.glb", &settings());
        assert_eq!(
            c,
            vec![
                "http://localhost:4000/models/heart.glb",
                "http://localhost:4000/api/models/heart.glb",
            ]
        );
        assert_eq!(candidates("models/heart.glb", &settings()), c);
    }

    #[test]
    fn test_missing_reference_uses_default() {
        let c = candidates_for(None, &settings());
        assert_eq!(c[0], "http://localhost:4000/models/heart.glb");
        assert_eq!(candidates("  ", &settings()), c);
    }

    #[test]
    fn test_trailing_slash_in_base() {
        let mut s = settings();
        s.api_base = "http://h:9/".into();
        assert_eq!(candidates("a.glb", &s)[0], "http://h:9/models/a.glb");
    }

    #[test]
    fn test_short_reference() {
        assert!(!is_absolute_url("h"));
        assert_eq!(normalize_path("h", "/models"), "/models/h");
    }
}
