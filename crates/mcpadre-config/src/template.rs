//! `{{dirs.*}}` / `{{parentEnv.*}}` template expansion
//!
//! A template is literal text with embedded bindings. `dirs.*` bindings
//! must resolve or the whole template fails; a missing `parentEnv.NAME`
//! expands to the empty string so optional variables like `TMPDIR` can be
//! probed (callers drop empty results).

use std::collections::HashMap;
use std::sync::OnceLock;

use mcpadre_fs::NormalizedPath;
use regex::Regex;

use crate::dirs::{DirKey, DirectoryResolver};
use crate::error::{Error, Result};
use crate::schema::template::{EnvTemplate, PathTemplate};

fn binding_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{\s*(dirs|parentEnv)\.([A-Za-z0-9_]+)\s*\}\}").expect("valid pattern")
    })
}

/// Expand every binding in one template string.
pub fn resolve_template(
    template: &str,
    resolver: &DirectoryResolver,
    parent_env: &HashMap<String, String>,
) -> Result<String> {
    let mut output = String::with_capacity(template.len());
    let mut last_end = 0;

    for capture in binding_pattern().captures_iter(template) {
        let whole = capture.get(0).expect("capture 0");
        output.push_str(&template[last_end..whole.start()]);
        last_end = whole.end();

        let namespace = &capture[1];
        let name = &capture[2];
        match namespace {
            "dirs" => {
                let key = DirKey::parse(name).ok_or_else(|| Error::TemplateUnresolved {
                    template: template.to_string(),
                    token: format!("dirs.{name}"),
                })?;
                output.push_str(resolver.resolve(key)?.as_str());
            }
            "parentEnv" => {
                // Missing variables expand to "" so optional env probing
                // (TMPDIR/TEMP/TMP) stays total; callers drop empties.
                if let Some(value) = parent_env.get(name) {
                    output.push_str(value);
                }
            }
            _ => unreachable!("pattern only matches dirs|parentEnv"),
        }
    }
    output.push_str(&template[last_end..]);
    Ok(output)
}

/// Resolve a list of path templates into absolute, canonicalized paths.
///
/// Empty expansions are dropped. Relative results are anchored at the
/// workspace root. Canonicalization only rewrites paths that exist.
pub fn resolve_path_templates(
    templates: &[PathTemplate],
    resolver: &DirectoryResolver,
    parent_env: &HashMap<String, String>,
) -> Result<Vec<NormalizedPath>> {
    let mut resolved = Vec::with_capacity(templates.len());
    for template in templates {
        let expanded = resolve_template(template.as_str(), resolver, parent_env)?;
        if expanded.is_empty() {
            continue;
        }
        let absolute = if std::path::Path::new(&expanded).is_absolute() {
            NormalizedPath::new(&expanded)
        } else {
            resolver.layout().workspace_root().join(&expanded)
        };
        resolved.push(absolute.canonicalize());
    }
    Ok(resolved)
}

/// Resolve a per-server env map into concrete values.
pub fn resolve_env_map(
    env: &std::collections::BTreeMap<String, EnvTemplate>,
    resolver: &DirectoryResolver,
    parent_env: &HashMap<String, String>,
) -> Result<std::collections::BTreeMap<String, String>> {
    env.iter()
        .map(|(key, template)| {
            resolve_template(template.as_str(), resolver, parent_env)
                .map(|value| (key.clone(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn test_resolver() -> DirectoryResolver {
        let mut env = HashMap::new();
        env.insert("HOME".to_string(), "/home/dev".to_string());
        DirectoryResolver::new("/workspace", env)
    }

    fn parent_env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_literal_passthrough() {
        let result =
            resolve_template("/usr/bin", &test_resolver(), &HashMap::new()).unwrap();
        assert_eq!(result, "/usr/bin");
    }

    #[test]
    fn test_dirs_expansion() {
        let result = resolve_template(
            "{{dirs.workspace}}/.mcpadre",
            &test_resolver(),
            &HashMap::new(),
        )
        .unwrap();
        assert_eq!(result, "/workspace/.mcpadre");
    }

    #[test]
    fn test_parent_env_expansion() {
        let result = resolve_template(
            "{{parentEnv.TMPDIR}}/scratch",
            &test_resolver(),
            &parent_env(&[("TMPDIR", "/var/tmp")]),
        )
        .unwrap();
        assert_eq!(result, "/var/tmp/scratch");
    }

    #[test]
    fn test_missing_parent_env_is_empty() {
        let result = resolve_template(
            "{{parentEnv.NOT_SET}}",
            &test_resolver(),
            &HashMap::new(),
        )
        .unwrap();
        assert_eq!(result, "");
    }

    #[test]
    fn test_unknown_dirs_key_fails() {
        let err = resolve_template("{{dirs.unknown}}", &test_resolver(), &HashMap::new())
            .unwrap_err();
        assert!(matches!(err, Error::TemplateUnresolved { .. }));
    }

    #[test]
    fn test_whitespace_inside_braces() {
        let result = resolve_template(
            "{{ dirs.workspace }}",
            &test_resolver(),
            &HashMap::new(),
        )
        .unwrap();
        assert_eq!(result, "/workspace");
    }

    #[test]
    fn test_multiple_bindings_in_one_template() {
        let result = resolve_template(
            "{{dirs.home}}:{{parentEnv.USER}}",
            &test_resolver(),
            &parent_env(&[("USER", "dev")]),
        )
        .unwrap();
        assert_eq!(result, "/home/dev:dev");
    }

    #[test]
    fn test_resolve_path_templates_drops_empty() {
        let templates = vec![
            PathTemplate::from("{{parentEnv.TMPDIR}}"),
            PathTemplate::from("/tmp"),
        ];
        let resolved =
            resolve_path_templates(&templates, &test_resolver(), &HashMap::new()).unwrap();
        assert_eq!(resolved.len(), 1);
        // /tmp canonicalizes to /private/tmp on macOS; both end with "tmp"
        assert!(resolved[0].as_str().ends_with("tmp"));
    }

    #[test]
    fn test_resolve_path_templates_anchors_relative_at_workspace() {
        let templates = vec![PathTemplate::from("data/store")];
        let resolved =
            resolve_path_templates(&templates, &test_resolver(), &HashMap::new()).unwrap();
        assert_eq!(resolved[0].as_str(), "/workspace/data/store");
    }

    #[test]
    fn test_resolve_env_map() {
        let mut env = std::collections::BTreeMap::new();
        env.insert("TOKEN".to_string(), EnvTemplate::from("{{parentEnv.TOKEN}}"));
        env.insert("STATIC".to_string(), EnvTemplate::from("fixed"));

        let resolved = resolve_env_map(
            &env,
            &test_resolver(),
            &parent_env(&[("TOKEN", "secret")]),
        )
        .unwrap();
        assert_eq!(resolved["TOKEN"], "secret");
        assert_eq!(resolved["STATIC"], "fixed");
    }
}
