use crate::commands::{CmdMessage, CmdResult};
use crate::config::{ConfigStore, Environment};
use crate::error::{CouponError, Result};

#[derive(Debug, Clone)]
pub enum ConfigAction {
    Show,
    ListEnvironments,
    Use(String),
    AddEnvironment(String, Environment),
    RemoveEnvironment(String),
    SetKey(String, String),
    Reset,
}

pub fn run(store: &mut ConfigStore, action: ConfigAction) -> Result<CmdResult> {
    let mut result = match action {
        ConfigAction::Show | ConfigAction::ListEnvironments => CmdResult::default(),
        ConfigAction::Use(name) => {
            store.set_current_environment(&name)?;
            CmdResult::default().with_message(CmdMessage::success(format!(
                "Switched to environment: {}",
                name
            )))
        }
        ConfigAction::AddEnvironment(name, env) => {
            if store.contains(&name) {
                return Err(CouponError::validation(format!(
                    "environment '{}' already exists",
                    name
                )));
            }
            let has_key = env.has_api_key();
            store.add_environment(&name, env)?;

            let mut result = CmdResult::default().with_message(CmdMessage::success(format!(
                "Environment '{}' added",
                name
            )));
            if !has_key {
                result.add_message(CmdMessage::warning(format!(
                    "No API key set. Run 'coupongo config set-key {}' before using it.",
                    name
                )));
            }
            result
        }
        ConfigAction::RemoveEnvironment(name) => {
            let was_current = store.current_environment_name() == name;
            store.remove_environment(&name)?;

            let mut result = CmdResult::default().with_message(CmdMessage::success(format!(
                "Environment '{}' removed",
                name
            )));
            if was_current {
                result.add_message(CmdMessage::info(format!(
                    "Current environment is now: {}",
                    store.current_environment_name()
                )));
            }
            result
        }
        ConfigAction::SetKey(name, key) => {
            store.update_environment_api_key(&name, &key)?;
            CmdResult::default().with_message(CmdMessage::success(format!(
                "API key updated for environment: {}",
                name
            )))
        }
        ConfigAction::Reset => {
            store.reset()?;
            CmdResult::default()
                .with_message(CmdMessage::success("Configuration reset to defaults"))
                .with_message(CmdMessage::info(
                    "Run 'coupongo config init' to set up your API key.",
                ))
        }
    };

    result.config = Some(store.config().masked());
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::MessageLevel;
    use tempfile::{tempdir, TempDir};

    const KEY: &str = "sk_test_1234567890abcdefghij";

    fn store() -> (TempDir, ConfigStore) {
        let dir = tempdir().unwrap();
        let store = ConfigStore::load(dir.path().join("coupongo.json")).unwrap();
        (dir, store)
    }

    #[test]
    fn show_masks_keys() {
        let (_dir, mut store) = store();
        store.update_environment_api_key("test", KEY).unwrap();

        let result = run(&mut store, ConfigAction::Show).unwrap();
        let config = result.config.unwrap();
        assert_eq!(config.environments["test"].stripe_api_key, "sk_****ghij");
        assert_eq!(store.config().environments["test"].stripe_api_key, KEY);
    }

    #[test]
    fn add_use_remove() {
        let (_dir, mut store) = store();
        run(
            &mut store,
            ConfigAction::AddEnvironment("prod".into(), Environment::with_api_key(KEY)),
        )
        .unwrap();
        run(&mut store, ConfigAction::Use("prod".into())).unwrap();
        assert_eq!(store.current_environment_name(), "prod");

        let result = run(&mut store, ConfigAction::RemoveEnvironment("prod".into())).unwrap();
        assert_eq!(store.current_environment_name(), "test");
        assert_eq!(
            result.messages[1].content,
            "Current environment is now: test"
        );
    }

    #[test]
    fn add_refuses_duplicates() {
        let (_dir, mut store) = store();
        let err = run(
            &mut store,
            ConfigAction::AddEnvironment("test".into(), Environment::default()),
        )
        .unwrap_err();
        assert!(matches!(err, CouponError::Validation(_)));
    }

    #[test]
    fn add_without_key_warns() {
        let (_dir, mut store) = store();
        let result = run(
            &mut store,
            ConfigAction::AddEnvironment("staging".into(), Environment::default()),
        )
        .unwrap();
        assert_eq!(result.messages[1].level, MessageLevel::Warning);
    }

    #[test]
    fn removing_last_environment_fails() {
        let (_dir, mut store) = store();
        let err = run(&mut store, ConfigAction::RemoveEnvironment("test".into())).unwrap_err();
        assert_eq!(err.to_string(), "cannot remove the last environment");
    }

    #[test]
    fn set_key_validates() {
        let (_dir, mut store) = store();
        let err = run(&mut store, ConfigAction::SetKey("test".into(), "pk_short".into()))
            .unwrap_err();
        assert!(matches!(err, CouponError::InvalidApiKeyFormat(_)));

        run(&mut store, ConfigAction::SetKey("test".into(), KEY.into())).unwrap();
        assert!(store.current_environment().unwrap().has_api_key());
    }

    #[test]
    fn reset_restores_default() {
        let (_dir, mut store) = store();
        run(
            &mut store,
            ConfigAction::AddEnvironment("prod".into(), Environment::with_api_key(KEY)),
        )
        .unwrap();
        run(&mut store, ConfigAction::Reset).unwrap();
        assert_eq!(store.environment_names(), vec!["test".to_string()]);
    }
}
