use std::{env, fs, path::Path};

use crate::{domain::RoleId, errors::Error, Result};

/// Typed configuration, sourced from the environment at startup.
///
/// Both required settings are checked here, before anything touches the
/// network: a missing token or a missing/zero role id aborts the process
/// with a descriptive message.
#[derive(Clone, Debug)]
pub struct Config {
    pub bot_token: String,
    pub watched_role: RoleId,
    pub api_base: String,
    pub gateway_url: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let bot_token = env_str("DISCORD_BOT_TOKEN").unwrap_or_default();
        if bot_token.trim().is_empty() {
            return Err(Error::Config(
                "DISCORD_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let watched_role = parse_watched_role(env_str("DISCORD_WATCHED_ROLE_ID"))?;

        let api_base = env_str("DISCORD_API_BASE")
            .unwrap_or_else(|| "https://discord.com/api/v10".to_string());
        let gateway_url = env_str("DISCORD_GATEWAY_URL")
            .unwrap_or_else(|| "wss://gateway.discord.gg/?v=10&encoding=json".to_string());

        Ok(Self {
            bot_token,
            watched_role,
            api_base,
            gateway_url,
        })
    }
}

fn parse_watched_role(v: Option<String>) -> Result<RoleId> {
    let id = v
        .as_deref()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(0);
    if id == 0 {
        return Err(Error::Config(
            "DISCORD_WATCHED_ROLE_ID environment variable is required and must be a nonzero role id"
                .to_string(),
        ));
    }
    Ok(RoleId(id))
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watched_role_parses_nonzero_id() {
        let role = parse_watched_role(Some("999".to_string())).unwrap();
        assert_eq!(role, RoleId(999));
    }

    #[test]
    fn watched_role_rejects_missing_zero_and_garbage() {
        for v in [None, Some("0".to_string()), Some("".to_string()), Some("abc".to_string())] {
            let err = parse_watched_role(v).unwrap_err();
            assert!(matches!(err, Error::Config(_)));
        }
    }

    #[test]
    fn dotenv_loads_without_overriding_existing_env() {
        let path = std::path::PathBuf::from(format!("/tmp/rolewatch-env-{}", std::process::id()));
        std::fs::write(
            &path,
            "# comment\nROLEWATCH_TEST_FRESH=\"quoted value\"\nROLEWATCH_TEST_TAKEN=from-file\n\nnot-a-pair\n",
        )
        .unwrap();
        env::set_var("ROLEWATCH_TEST_TAKEN", "from-env");

        load_dotenv_if_present(&path);

        assert_eq!(env::var("ROLEWATCH_TEST_FRESH").unwrap(), "quoted value");
        assert_eq!(env::var("ROLEWATCH_TEST_TAKEN").unwrap(), "from-env");

        env::remove_var("ROLEWATCH_TEST_FRESH");
        env::remove_var("ROLEWATCH_TEST_TAKEN");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn dotenv_missing_file_is_a_noop() {
        load_dotenv_if_present(Path::new("/tmp/rolewatch-env-does-not-exist"));
    }

    // Single test for the whole startup sequence: each required setting
    // fails independently, then a complete environment loads. Kept in one
    // test because the keys are process-global.
    #[test]
    fn load_fails_fast_until_required_settings_present() {
        env::remove_var("DISCORD_BOT_TOKEN");
        env::remove_var("DISCORD_WATCHED_ROLE_ID");
        assert!(matches!(Config::load(), Err(Error::Config(_))));

        env::set_var("DISCORD_BOT_TOKEN", "test-token");
        assert!(matches!(Config::load(), Err(Error::Config(_))));

        env::set_var("DISCORD_WATCHED_ROLE_ID", "999");
        let cfg = Config::load().unwrap();
        assert_eq!(cfg.watched_role, RoleId(999));
        assert_eq!(cfg.api_base, "https://discord.com/api/v10");
        assert!(cfg.gateway_url.starts_with("wss://"));

        env::remove_var("DISCORD_BOT_TOKEN");
        env::remove_var("DISCORD_WATCHED_ROLE_ID");
    }
}
