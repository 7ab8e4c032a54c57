use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::gateway::{GitOutput, RepositoryGateway};

type Call = (Vec<String>, Vec<(String, String)>);

/// Scripted gateway for testing. Each rule is an argument prefix with a
/// queue of outputs; a call pops from the first matching rule that still
/// has outputs. Unmatched or exhausted calls succeed with empty output.
pub struct ScriptedGateway {
    root: PathBuf,
    rules: Mutex<Vec<(Vec<String>, VecDeque<GitOutput>)>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedGateway {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            rules: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue outputs for calls whose arguments start with `prefix`.
    pub fn respond(&self, prefix: &[&str], outputs: Vec<GitOutput>) {
        self.rules.lock().unwrap().push((
            prefix.iter().map(|s| s.to_string()).collect(),
            outputs.into(),
        ));
    }

    /// Arguments of every call, in order.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(args, _)| args.clone())
            .collect()
    }

    /// Number of calls whose arguments start with `prefix`.
    pub fn count(&self, prefix: &[&str]) -> usize {
        self.calls()
            .iter()
            .filter(|args| starts_with(args, prefix))
            .count()
    }

    /// Environment overrides passed with the first call matching `prefix`.
    pub fn env_of(&self, prefix: &[&str]) -> Option<Vec<(String, String)>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .find(|(args, _)| starts_with(args, prefix))
            .map(|(_, env)| env.clone())
    }
}

fn starts_with(args: &[String], prefix: &[&str]) -> bool {
    args.len() >= prefix.len() && args.iter().zip(prefix).all(|(a, p)| a == p)
}

impl RepositoryGateway for ScriptedGateway {
    fn root(&self) -> &Path {
        &self.root
    }

    fn execute(&self, args: &[&str], env: &[(&str, &str)]) -> GitOutput {
        let owned: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        self.calls.lock().unwrap().push((
            owned.clone(),
            env.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ));

        let mut rules = self.rules.lock().unwrap();
        for (prefix, queue) in rules.iter_mut() {
            let prefix: Vec<&str> = prefix.iter().map(String::as_str).collect();
            if starts_with(&owned, &prefix) {
                if let Some(out) = queue.pop_front() {
                    return out;
                }
            }
        }
        GitOutput::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_empty_success() {
        let gw = ScriptedGateway::new("/r");
        let out = gw.run(&["status"]);
        assert!(out.success());
        assert!(out.stdout.is_empty());
        assert_eq!(gw.count(&["status"]), 1);
    }

    #[test]
    fn pops_in_order_then_defaults() {
        let gw = ScriptedGateway::new("/r");
        gw.respond(
            &["push"],
            vec![GitOutput::failed(1, "rejected"), GitOutput::ok("pushed")],
        );
        assert_eq!(gw.run(&["push"]).exit_code, 1);
        assert_eq!(gw.run(&["push"]).stdout, "pushed");
        assert_eq!(gw.run(&["push"]), GitOutput::default());
        assert_eq!(gw.count(&["push"]), 3);
    }

    #[test]
    fn prefix_matching() {
        let gw = ScriptedGateway::new("/r");
        gw.respond(&["diff", "--cached"], vec![GitOutput::ok("a\n")]);
        assert_eq!(gw.run(&["diff", "HEAD"]).stdout, "");
        assert_eq!(gw.run(&["diff", "--cached", "--name-only"]).stdout, "a\n");
    }

    #[test]
    fn env_recorded() {
        let gw = ScriptedGateway::new("/r");
        gw.execute(&["rebase", "--continue"], &[("GIT_EDITOR", "true")]);
        assert_eq!(
            gw.env_of(&["rebase"]),
            Some(vec![("GIT_EDITOR".to_string(), "true".to_string())])
        );
        assert_eq!(gw.env_of(&["push"]), None);
    }
}
