use crate::config::RepoConfig;

/// A mainline job and the name of its clone for one branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobNamePair {
    pub source: String,
    pub target: String,
}

/// Expand every job template of `config` for `branch`, in declaration order.
///
/// Every occurrence of the placeholder is replaced literally; a pattern
/// without the placeholder is used as-is.
pub fn expand_jobs(branch: &str, config: &RepoConfig) -> Vec<JobNamePair> {
    let placeholder = config.placeholder();
    config
        .jobs
        .iter()
        .map(|template| JobNamePair {
            source: template.source_job.clone(),
            target: template.feature_branch_job.replace(placeholder, branch),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JobTemplate;
    use crate::transform::TransformProfile;

    fn config_with(patterns: &[(&str, &str)]) -> RepoConfig {
        RepoConfig {
            profile: None,
            jobs: patterns
                .iter()
                .map(|(source, target)| JobTemplate {
                    source_job: source.to_string(),
                    feature_branch_job: target.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_expand_single_template() {
        let config = config_with(&[("build", "build-$fb")]);
        assert_eq!(
            expand_jobs("xyz", &config),
            vec![JobNamePair {
                source: "build".to_string(),
                target: "build-xyz".to_string(),
            }]
        );
    }

    #[test]
    fn test_expand_replaces_every_occurrence() {
        let config = config_with(&[("build", "$fb/build-$fb")]);
        let pairs = expand_jobs("feature/x", &config);
        assert_eq!(pairs[0].target, "feature/x/build-feature/x");
    }

    #[test]
    fn test_expand_without_placeholder_is_literal() {
        let config = config_with(&[("build", "build-shared")]);
        assert_eq!(expand_jobs("a", &config)[0].target, "build-shared");
        assert_eq!(expand_jobs("b", &config)[0].target, "build-shared");
    }

    #[test]
    fn test_expand_preserves_order() {
        let config = config_with(&[("z", "z-$fb"), ("a", "a-$fb"), ("m", "m-$fb")]);
        let sources: Vec<_> = expand_jobs("b", &config)
            .into_iter()
            .map(|pair| pair.source)
            .collect();
        assert_eq!(sources, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_expand_uses_profile_placeholder() {
        let mut config = config_with(&[("build", "build-$name-$fb")]);
        config.profile = Some(TransformProfile::Isolated);
        assert_eq!(expand_jobs("x", &config)[0].target, "build-x-$fb");
    }

    #[test]
    fn test_expand_empty_config() {
        assert!(expand_jobs("x", &RepoConfig::default()).is_empty());
    }
}
