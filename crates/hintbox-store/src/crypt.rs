//! ISMA stream protection state.
//!
//! Protection here is declarative: tracks carry the scheme and key
//! management URIs, and the actual cipher lives outside the store. The
//! crypt configuration is a small JSON document.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use hintbox_core::{Error, Result};

use crate::movie::Movie;
use crate::track::Protection;

/// Crypt configuration, loaded from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptSpec {
    pub scheme_uri: String,
    pub kms_uri: String,
}

impl CryptSpec {
    /// Load a crypt configuration from `path`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| Error::InvalidRequest(format!("bad crypt file {}: {e}", path.display())))
    }
}

/// Mark every audio/visual track as protected under `spec`.
pub fn encrypt_movie(movie: &mut Movie, spec: &CryptSpec) -> Result<usize> {
    let mut protected = 0usize;
    for index in 0..movie.track_count() {
        if !movie.track(index)?.media_type().is_av() {
            continue;
        }
        let track = movie.track_mut(index)?;
        if track.protection.is_some() {
            return Err(Error::InvalidRequest(format!(
                "track {} is already protected",
                track.id
            )));
        }
        track.protection = Some(Protection {
            scheme_uri: spec.scheme_uri.clone(),
            kms_uri: spec.kms_uri.clone(),
        });
        protected += 1;
    }
    if protected > 0 {
        movie.mark_dirty();
        tracing::info!("Protected {protected} track(s) with scheme {}", spec.scheme_uri);
    }
    Ok(protected)
}

/// Remove protection from every track. Returns how many were cleared.
pub fn decrypt_movie(movie: &mut Movie) -> Result<usize> {
    let mut cleared = 0usize;
    for index in 0..movie.track_count() {
        let track = movie.track_mut(index)?;
        if track.protection.take().is_some() {
            cleared += 1;
        }
    }
    if cleared > 0 {
        movie.mark_dirty();
    }
    Ok(cleared)
}

/// Rewrite the key management URI of the track at `index`.
pub fn change_kms_uri(movie: &mut Movie, index: usize, kms_uri: &str) -> Result<()> {
    let track = movie.track_mut(index)?;
    let id = track.id;
    let Some(protection) = track.protection.as_mut() else {
        return Err(Error::InvalidRequest(format!("track {id} is not protected")));
    };
    protection.kms_uri = kms_uri.to_string();
    movie.mark_dirty();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::Sample;
    use hintbox_core::{MediaType, OpenMode};
    use std::io::Write;

    fn spec() -> CryptSpec {
        CryptSpec {
            scheme_uri: "urn:example:isma-cenc".into(),
            kms_uri: "https://kms.example/v1".into(),
        }
    }

    fn av_movie() -> Movie {
        let mut movie = Movie::open("crypt.hbx", OpenMode::CreateInterleaved).unwrap();
        movie.add_track(MediaType::Visual, 90000);
        movie.add_sample(0, Sample::new(vec![1u8; 16], 3000)).unwrap();
        movie.add_track(MediaType::Scene, 1000);
        movie
    }

    #[test]
    fn encrypt_skips_non_av_tracks() {
        let mut movie = av_movie();
        assert_eq!(encrypt_movie(&mut movie, &spec()).unwrap(), 1);
        assert!(movie.track(0).unwrap().is_protected());
        assert!(!movie.track(1).unwrap().is_protected());
    }

    #[test]
    fn double_encrypt_is_rejected() {
        let mut movie = av_movie();
        encrypt_movie(&mut movie, &spec()).unwrap();
        assert!(encrypt_movie(&mut movie, &spec()).is_err());
    }

    #[test]
    fn decrypt_clears_protection() {
        let mut movie = av_movie();
        encrypt_movie(&mut movie, &spec()).unwrap();
        assert_eq!(decrypt_movie(&mut movie).unwrap(), 1);
        assert!(!movie.track(0).unwrap().is_protected());
    }

    #[test]
    fn kms_rewrite_requires_protection() {
        let mut movie = av_movie();
        assert!(change_kms_uri(&mut movie, 0, "https://other").is_err());
        encrypt_movie(&mut movie, &spec()).unwrap();
        change_kms_uri(&mut movie, 0, "https://other").unwrap();
        let p = movie.track(0).unwrap().protection().unwrap();
        assert_eq!(p.kms_uri, "https://other");
    }

    #[test]
    fn spec_loads_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drm.json");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(br#"{"scheme_uri":"urn:x","kms_uri":"https://k"}"#)
            .unwrap();
        let loaded = CryptSpec::from_file(&path).unwrap();
        assert_eq!(loaded.scheme_uri, "urn:x");
    }
}
