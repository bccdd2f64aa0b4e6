//! Flat key/value configuration
//!
//! Keys are dotted names such as `user.name`. Commit identities come from `user.name` and
//! `user.email`, falling back to the `GEOBIT_AUTHOR_NAME` and `GEOBIT_AUTHOR_EMAIL`
//! environment variables. `GEOBIT_AUTHOR_DATE` pins the commit timestamp.

use crate::artifacts::objects::commit::Person;

pub const USER_NAME_KEY: &str = "user.name";
pub const USER_EMAIL_KEY: &str = "user.email";
pub const AUTHOR_NAME_ENV: &str = "GEOBIT_AUTHOR_NAME";
pub const AUTHOR_EMAIL_ENV: &str = "GEOBIT_AUTHOR_EMAIL";
pub const AUTHOR_DATE_ENV: &str = "GEOBIT_AUTHOR_DATE";

/// Storage backend for configuration
pub trait ConfigStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;

    fn unset(&self, key: &str) -> anyhow::Result<()>;
}

pub struct Config {
    store: Box<dyn ConfigStore>,
}

impl Config {
    pub fn new(store: Box<dyn ConfigStore>) -> Self {
        Config { store }
    }

    pub fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.store.get(key)
    }

    pub fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.store.set(key, value)
    }

    pub fn unset(&self, key: &str) -> anyhow::Result<()> {
        self.store.unset(key)
    }

    /// Identity used for new commits, stamped with the current time
    pub fn identity(&self) -> anyhow::Result<Option<Person>> {
        let name = self.lookup(USER_NAME_KEY, AUTHOR_NAME_ENV)?;
        let email = self.lookup(USER_EMAIL_KEY, AUTHOR_EMAIL_ENV)?;

        let timestamp = std::env::var(AUTHOR_DATE_ENV).ok().and_then(|date_str| {
            chrono::DateTime::parse_from_rfc2822(&date_str)
                .or_else(|_| chrono::DateTime::parse_from_str(&date_str, "%Y-%m-%d %H:%M:%S %z"))
                .ok()
        });

        Ok(match (name, email, timestamp) {
            (Some(name), Some(email), Some(timestamp)) => {
                Some(Person::new_with_timestamp(name, email, timestamp))
            }
            (Some(name), Some(email), None) => Some(Person::new(name, email)),
            _ => None,
        })
    }

    fn lookup(&self, key: &str, env_var: &str) -> anyhow::Result<Option<String>> {
        Ok(self
            .store
            .get(key)?
            .or_else(|| std::env::var(env_var).ok())
            .filter(|value| !value.trim().is_empty()))
    }

    /// Record that a local branch tracks a remote one
    pub fn set_tracking(&self, branch: &str, remote: &str, merge_ref: &str) -> anyhow::Result<()> {
        self.store.set(&format!("branches.{branch}.remote"), remote)?;
        self.store.set(&format!("branches.{branch}.merge"), merge_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryConfigStore;

    #[test]
    fn identity_comes_from_config_keys() {
        let config = Config::new(Box::new(MemoryConfigStore::default()));
        config.set(USER_NAME_KEY, "Ada Surveyor").unwrap();
        config.set(USER_EMAIL_KEY, "ada@example.com").unwrap();

        let person = config.identity().unwrap().unwrap();

        assert_eq!(person.name(), "Ada Surveyor");
        assert_eq!(person.email(), "ada@example.com");
    }

    #[test]
    fn tracking_keys_are_namespaced_by_branch() {
        let config = Config::new(Box::new(MemoryConfigStore::default()));
        config
            .set_tracking("roads", "origin", "refs/heads/roads")
            .unwrap();

        assert_eq!(
            config.get("branches.roads.remote").unwrap().as_deref(),
            Some("origin")
        );
        assert_eq!(
            config.get("branches.roads.merge").unwrap().as_deref(),
            Some("refs/heads/roads")
        );
        config.unset("branches.roads.remote").unwrap();
        assert_eq!(config.get("branches.roads.remote").unwrap(), None);
    }
}
