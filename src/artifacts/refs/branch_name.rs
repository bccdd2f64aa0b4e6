use crate::artifacts::refs::{HEADS_PREFIX, INVALID_BRANCH_NAME_REGEX, REMOTES_PREFIX};
use anyhow::Context;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct BranchName(String);

impl BranchName {
    pub fn try_parse(name: String) -> anyhow::Result<Self> {
        if name.is_empty() {
            anyhow::bail!("branch name cannot be empty");
        }

        let re = regex::Regex::new(INVALID_BRANCH_NAME_REGEX)
            .with_context(|| format!("invalid branch name regex: {INVALID_BRANCH_NAME_REGEX}"))?;

        if re.is_match(&name) {
            anyhow::bail!("invalid branch name: {}", name);
        } else {
            Ok(Self(name))
        }
    }

    /// Parse the branch out of a full `refs/heads/<name>` ref name
    pub fn try_parse_ref_name(ref_name: &str) -> anyhow::Result<Self> {
        let Some(name) = ref_name.strip_prefix(HEADS_PREFIX) else {
            anyhow::bail!(
                "branch ref name must start with '{}', got '{}'",
                HEADS_PREFIX,
                ref_name
            );
        };

        Self::try_parse(name.to_string())
    }

    /// Local branch name for a remote-tracking ref, e.g. `origin/roads` becomes `roads`
    pub fn try_parse_remote(ref_name: &str) -> anyhow::Result<(String, Self)> {
        let name = ref_name.strip_prefix(REMOTES_PREFIX).unwrap_or(ref_name);
        let (remote, branch) = name
            .split_once('/')
            .with_context(|| format!("not a remote branch: {ref_name}"))?;

        Ok((remote.to_string(), Self::try_parse(branch.to_string())?))
    }

    pub fn to_ref_name(&self) -> String {
        format!("{HEADS_PREFIX}{}", self.0)
    }

    pub fn is_default_branch(&self) -> bool {
        self.0 == "master" || self.0 == "main"
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("master")]
    #[case("feature/parcels-cleanup")]
    #[case("release-1.2")]
    fn valid_names_parse(#[case] name: &str) {
        let branch = BranchName::try_parse(name.to_string()).unwrap();

        assert_eq!(branch.as_ref(), name);
        assert_eq!(branch.to_ref_name(), format!("refs/heads/{name}"));
    }

    #[rstest]
    #[case("")]
    #[case(".hidden")]
    #[case("a..b")]
    #[case("/leading")]
    #[case("trailing/")]
    #[case("name.lock")]
    #[case("with space")]
    #[case("at@{1}")]
    #[case("tilde~1")]
    fn invalid_names_are_rejected(#[case] name: &str) {
        assert!(BranchName::try_parse(name.to_string()).is_err());
    }

    #[test]
    fn ref_names_must_live_under_heads() {
        assert_eq!(
            BranchName::try_parse_ref_name("refs/heads/roads").unwrap().as_ref(),
            "roads"
        );
        assert!(BranchName::try_parse_ref_name("refs/tags/v1").is_err());
    }

    #[test]
    fn remote_refs_split_into_remote_and_branch() {
        let (remote, branch) = BranchName::try_parse_remote("refs/remotes/origin/roads").unwrap();

        assert_eq!(remote, "origin");
        assert_eq!(branch.as_ref(), "roads");
        assert!(BranchName::try_parse_remote("roads").is_err());
    }

    proptest! {
        #[test]
        fn names_with_forbidden_characters_are_rejected(
            prefix in "[a-z]{1,8}",
            forbidden in prop::sample::select(vec!['*', ':', '?', '[', '\\', '~', '^', ' ']),
            suffix in "[a-z]{1,8}",
        ) {
            let name = format!("{prefix}{forbidden}{suffix}");
            prop_assert!(BranchName::try_parse(name).is_err());
        }

        #[test]
        fn plain_alphanumeric_names_are_accepted(name in "[a-zA-Z0-9][a-zA-Z0-9_-]{0,30}") {
            prop_assert!(BranchName::try_parse(name).is_ok());
        }
    }
}
