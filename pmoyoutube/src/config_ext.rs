//! Extension pour intégrer YouTube dans pmoconfig
//!
//! Ce module fournit le trait `YoutubeConfigExt` qui ajoute à
//! `pmoconfig::Config` les réglages de la source YouTube : activation,
//! cache, User-Agent, qualificatif de recherche et paramètres de yt-dlp.
//!
//! # Exemple
//!
//! ```no_run
//! use pmoconfig::get_config;
//! use pmoyoutube::YoutubeConfigExt;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = get_config();
//!
//! if !config.get_youtube_enabled()? {
//!     println!("YouTube is disabled");
//!     return Ok(());
//! }
//!
//! let settings = config.get_youtube_settings()?;
//! println!("Cache TTL: {:?}", settings.cache_ttl);
//! # Ok(())
//! # }
//! ```

use crate::cache::{DEFAULT_CACHE_TTL_SECS, DEFAULT_MAX_CAPACITY};
use crate::client::{
    DEFAULT_SEARCH_QUALIFIER, DEFAULT_SWEEP_INTERVAL_SECS, DEFAULT_USER_AGENT, YoutubeSettings,
};
use crate::ytdlp::{
    DEFAULT_BINARY, DEFAULT_FLAT_TIMEOUT_SECS, DEFAULT_FULL_TIMEOUT_SECS, DEFAULT_PLAYLIST_END,
};
use anyhow::Result;
use pmoconfig::Config;
use serde_yaml::Value;
use std::time::Duration;

const ENABLED: &[&str] = &["sources", "youtube", "enabled"];
const CACHE_TTL: &[&str] = &["sources", "youtube", "cache_ttl_secs"];
const USER_AGENT: &[&str] = &["sources", "youtube", "user_agent"];
const SEARCH_QUALIFIER: &[&str] = &["sources", "youtube", "search_qualifier"];
const CACHE_MAX_CAPACITY: &[&str] = &["sources", "youtube", "cache", "max_capacity"];
const SWEEP_INTERVAL: &[&str] = &["sources", "youtube", "cache", "sweep_interval_secs"];
const YTDLP_BINARY: &[&str] = &["sources", "youtube", "extractor", "binary"];
const FULL_TIMEOUT: &[&str] = &["sources", "youtube", "extractor", "full_timeout_secs"];
const FLAT_TIMEOUT: &[&str] = &["sources", "youtube", "extractor", "flat_timeout_secs"];
const PLAYLIST_END: &[&str] = &["sources", "youtube", "extractor", "playlist_end"];

/// Trait d'extension pour gérer la configuration YouTube dans pmoconfig
///
/// # Auto-persist des valeurs par défaut
///
/// Les getters persistent automatiquement la valeur par défaut dans la
/// configuration si la clé est absente ou d'un type invalide.
pub trait YoutubeConfigExt {
    /// Vérifie si la source YouTube est activée (default: `true`)
    fn get_youtube_enabled(&self) -> Result<bool>;

    /// Active ou désactive la source YouTube
    fn set_youtube_enabled(&self, enabled: bool) -> Result<()>;

    /// TTL du cache des résultats (default: 3 heures)
    fn get_youtube_cache_ttl(&self) -> Result<Duration>;

    fn set_youtube_cache_ttl(&self, ttl: Duration) -> Result<()>;

    /// User-Agent renvoyé avec chaque piste
    fn get_youtube_user_agent(&self) -> Result<String>;

    fn set_youtube_user_agent(&self, user_agent: &str) -> Result<()>;

    /// Suffixe ajouté aux recherches (default: "official audio")
    fn get_youtube_search_qualifier(&self) -> Result<String>;

    fn set_youtube_search_qualifier(&self, qualifier: &str) -> Result<()>;

    /// Nombre maximum d'entrées du cache mémoire
    fn get_youtube_cache_max_capacity(&self) -> Result<u64>;

    /// Période de la purge du cache
    fn get_youtube_sweep_interval(&self) -> Result<Duration>;

    /// Chemin ou nom de l'exécutable yt-dlp
    fn get_youtube_ytdlp_binary(&self) -> Result<String>;

    fn set_youtube_ytdlp_binary(&self, binary: &str) -> Result<()>;

    /// Timeouts des extractions complète et à plat
    fn get_youtube_extractor_timeouts(&self) -> Result<(Duration, Duration)>;

    /// Nombre d'entrées demandées lors du listage d'un Mix
    fn get_youtube_playlist_end(&self) -> Result<usize>;

    /// Tous les réglages en une seule valeur
    fn get_youtube_settings(&self) -> Result<YoutubeSettings>;
}

impl YoutubeConfigExt for Config {
    fn get_youtube_enabled(&self) -> Result<bool> {
        match self.get_value(ENABLED) {
            Ok(Value::Bool(b)) => Ok(b),
            _ => {
                self.set_youtube_enabled(true)?;
                Ok(true)
            }
        }
    }

    fn set_youtube_enabled(&self, enabled: bool) -> Result<()> {
        self.set_value(ENABLED, Value::Bool(enabled))
    }

    fn get_youtube_cache_ttl(&self) -> Result<Duration> {
        get_u64(self, CACHE_TTL, DEFAULT_CACHE_TTL_SECS).map(Duration::from_secs)
    }

    fn set_youtube_cache_ttl(&self, ttl: Duration) -> Result<()> {
        set_u64(self, CACHE_TTL, ttl.as_secs())
    }

    fn get_youtube_user_agent(&self) -> Result<String> {
        get_string(self, USER_AGENT, DEFAULT_USER_AGENT)
    }

    fn set_youtube_user_agent(&self, user_agent: &str) -> Result<()> {
        self.set_value(USER_AGENT, Value::String(user_agent.to_string()))
    }

    fn get_youtube_search_qualifier(&self) -> Result<String> {
        // Une chaîne vide est une valeur légitime (pas de qualificatif)
        match self.get_value(SEARCH_QUALIFIER) {
            Ok(Value::String(s)) => Ok(s),
            _ => {
                self.set_youtube_search_qualifier(DEFAULT_SEARCH_QUALIFIER)?;
                Ok(DEFAULT_SEARCH_QUALIFIER.to_string())
            }
        }
    }

    fn set_youtube_search_qualifier(&self, qualifier: &str) -> Result<()> {
        self.set_value(SEARCH_QUALIFIER, Value::String(qualifier.to_string()))
    }

    fn get_youtube_cache_max_capacity(&self) -> Result<u64> {
        get_u64(self, CACHE_MAX_CAPACITY, DEFAULT_MAX_CAPACITY)
    }

    fn get_youtube_sweep_interval(&self) -> Result<Duration> {
        get_u64(self, SWEEP_INTERVAL, DEFAULT_SWEEP_INTERVAL_SECS).map(Duration::from_secs)
    }

    fn get_youtube_ytdlp_binary(&self) -> Result<String> {
        get_string(self, YTDLP_BINARY, DEFAULT_BINARY)
    }

    fn set_youtube_ytdlp_binary(&self, binary: &str) -> Result<()> {
        self.set_value(YTDLP_BINARY, Value::String(binary.to_string()))
    }

    fn get_youtube_extractor_timeouts(&self) -> Result<(Duration, Duration)> {
        let full = get_u64(self, FULL_TIMEOUT, DEFAULT_FULL_TIMEOUT_SECS)?;
        let flat = get_u64(self, FLAT_TIMEOUT, DEFAULT_FLAT_TIMEOUT_SECS)?;
        Ok((Duration::from_secs(full), Duration::from_secs(flat)))
    }

    fn get_youtube_playlist_end(&self) -> Result<usize> {
        get_u64(self, PLAYLIST_END, DEFAULT_PLAYLIST_END as u64).map(|n| n as usize)
    }

    fn get_youtube_settings(&self) -> Result<YoutubeSettings> {
        let (full_timeout, flat_timeout) = self.get_youtube_extractor_timeouts()?;

        Ok(YoutubeSettings {
            cache_ttl: self.get_youtube_cache_ttl()?,
            cache_max_capacity: self.get_youtube_cache_max_capacity()?,
            sweep_interval: self.get_youtube_sweep_interval()?,
            user_agent: self.get_youtube_user_agent()?,
            search_qualifier: self.get_youtube_search_qualifier()?,
            ytdlp_binary: self.get_youtube_ytdlp_binary()?,
            full_timeout,
            flat_timeout,
            playlist_end: self.get_youtube_playlist_end()?,
        })
    }
}

fn get_u64(config: &Config, path: &[&str], default: u64) -> Result<u64> {
    match config.get_value(path).ok().and_then(|v| v.as_u64()) {
        Some(n) => Ok(n),
        None => {
            // Absente ou invalide : on persiste la valeur par défaut
            set_u64(config, path, default)?;
            Ok(default)
        }
    }
}

fn set_u64(config: &Config, path: &[&str], value: u64) -> Result<()> {
    config.set_value(path, Value::Number(serde_yaml::Number::from(value)))
}

fn get_string(config: &Config, path: &[&str], default: &str) -> Result<String> {
    match config.get_value(path) {
        Ok(Value::String(s)) if !s.trim().is_empty() => Ok(s),
        _ => {
            config.set_value(path, Value::String(default.to_string()))?;
            Ok(default.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn load(dir: &std::path::Path) -> Config {
        Config::load_config(dir.to_str().unwrap()).unwrap()
    }

    #[test]
    fn test_embedded_defaults() {
        let dir = tempdir().unwrap();
        let config = load(dir.path());

        let settings = config.get_youtube_settings().unwrap();
        assert_eq!(settings, YoutubeSettings::default());
        assert!(config.get_youtube_enabled().unwrap());
    }

    #[test]
    fn test_setters_are_persisted() {
        let dir = tempdir().unwrap();
        {
            let config = load(dir.path());
            config.set_youtube_enabled(false).unwrap();
            config.set_youtube_cache_ttl(Duration::from_secs(60)).unwrap();
            config.set_youtube_search_qualifier("").unwrap();
            config.set_youtube_ytdlp_binary("/opt/yt-dlp").unwrap();
        }

        let config = load(dir.path());
        assert!(!config.get_youtube_enabled().unwrap());
        assert_eq!(config.get_youtube_cache_ttl().unwrap(), Duration::from_secs(60));
        assert_eq!(config.get_youtube_search_qualifier().unwrap(), "");
        assert_eq!(config.get_youtube_ytdlp_binary().unwrap(), "/opt/yt-dlp");
    }

    #[test]
    fn test_invalid_value_falls_back_to_default() {
        let dir = tempdir().unwrap();
        let config = load(dir.path());

        config
            .set_value(CACHE_TTL, Value::String("three hours".to_string()))
            .unwrap();
        assert_eq!(
            config.get_youtube_cache_ttl().unwrap(),
            Duration::from_secs(DEFAULT_CACHE_TTL_SECS)
        );
        // La valeur par défaut a été réécrite
        assert!(matches!(config.get_value(CACHE_TTL).unwrap(), Value::Number(_)));
    }
}
