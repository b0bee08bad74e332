use anyhow::{Result, anyhow};
use chrono_tz::Tz;
use directories::UserDirs;
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::align::AlignParams;
use crate::pipeline::{
    BABOLAT_ZEPP_CLOCK_OFFSET_S, MATCH_TOLERANCE_S, SessionSettings, WATCH_ZEPP_CLOCK_OFFSET_S,
};
use crate::score::OutlierClip;
use crate::timebase;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub timezone: String,
    #[serde(default = "default_max_window_days")]
    pub max_window_days: u32,
}

fn default_max_window_days() -> u32 {
    30
}

/// Clock relationship between two devices, found by inspection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pairing {
    pub clock_offset_s: f64,
    #[serde(default = "default_tolerance")]
    pub tolerance_s: f64,
}

fn default_tolerance() -> f64 {
    MATCH_TOLERANCE_S
}

impl Pairing {
    pub fn params(&self) -> AlignParams {
        AlignParams::from_secs(self.tolerance_s, self.clock_offset_s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pairings {
    #[serde(default = "default_babolat_zepp")]
    pub babolat_zepp: Pairing,
    #[serde(default = "default_watch_zepp")]
    pub watch_zepp: Pairing,
}

fn default_babolat_zepp() -> Pairing {
    Pairing {
        clock_offset_s: BABOLAT_ZEPP_CLOCK_OFFSET_S,
        tolerance_s: MATCH_TOLERANCE_S,
    }
}

fn default_watch_zepp() -> Pairing {
    Pairing {
        clock_offset_s: WATCH_ZEPP_CLOCK_OFFSET_S,
        tolerance_s: MATCH_TOLERANCE_S,
    }
}

impl Default for Pairings {
    fn default() -> Self {
        Self {
            babolat_zepp: default_babolat_zepp(),
            watch_zepp: default_watch_zepp(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub session: Session,
    #[serde(default)]
    pub pairing: Pairings,
    #[serde(default)]
    pub outliers: OutlierClip,
}

/// Parsed, validated profile plus where it came from.
#[derive(Debug, Clone)]
pub struct Config {
    pub path: PathBuf,
    pub profile: Profile,
    pub tz: Tz,
}

fn config_dir() -> Result<PathBuf> {
    let home = UserDirs::new()
        .ok_or_else(|| anyhow!("cannot locate home directory"))?
        .home_dir()
        .to_path_buf();
    Ok(home.join(".config").join("sensorfuse"))
}

fn default_profile_text() -> &'static str {
    include_str!("../profiles/default.toml")
}

impl Config {
    pub fn load_or_install_default() -> Result<Self> {
        let dir = config_dir()?;
        fs::create_dir_all(&dir)?;
        let path = dir.join("config.toml");
        if !path.exists() {
            fs::write(&path, default_profile_text())?;
            info!("installed default config at {}", path.display());
        }
        Self::load(&path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let txt = fs::read_to_string(path)
            .map_err(|e| anyhow!("failed to read {}: {e}", path.display()))?;
        let mut cfg = Self::from_toml(&txt).map_err(|e| anyhow!("{}: {e}", path.display()))?;
        cfg.path = path.to_path_buf();
        Ok(cfg)
    }

    pub fn from_toml(txt: &str) -> Result<Self> {
        let profile: Profile =
            toml::from_str(txt).map_err(|e| anyhow!("failed to parse config: {e}"))?;
        let tz = validate_profile(&profile)?;
        Ok(Self {
            path: PathBuf::new(),
            profile,
            tz,
        })
    }

    pub fn builtin() -> Result<Self> {
        Self::from_toml(default_profile_text())
    }

    pub fn settings(&self) -> SessionSettings {
        SessionSettings {
            tz: self.tz,
            babolat_zepp: self.profile.pairing.babolat_zepp.params(),
            watch_zepp: self.profile.pairing.watch_zepp.params(),
            outliers: self.profile.outliers,
        }
    }

    pub fn report(&self) -> serde_json::Value {
        serde_json::json!({
            "path": self.path,
            "profile": self.profile,
        })
    }
}

fn validate_profile(p: &Profile) -> Result<Tz> {
    let tz = timebase::parse_timezone(&p.session.timezone)?;
    if p.session.max_window_days == 0 {
        return Err(anyhow!("session.max_window_days must be positive"));
    }
    for (name, pairing) in [
        ("babolat_zepp", &p.pairing.babolat_zepp),
        ("watch_zepp", &p.pairing.watch_zepp),
    ] {
        if !pairing.tolerance_s.is_finite() || pairing.tolerance_s < 0.0 {
            return Err(anyhow!("pairing.{name}.tolerance_s must be a non-negative number"));
        }
        if !pairing.clock_offset_s.is_finite() {
            return Err(anyhow!("pairing.{name}.clock_offset_s must be finite"));
        }
    }
    if !(p.outliers.acc_limit > 0.0 && p.outliers.score_limit > 0.0) {
        return Err(anyhow!("outlier limits must be positive"));
    }
    Ok(tz)
}
