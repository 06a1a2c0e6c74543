// src/services/transform.rs

//! Text-to-text CSS transforms (prefixer, minifier).

use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

pub type TransformFuture<'a> = Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;

/// Maps stylesheet content to new content.
pub trait Transform: Send + Sync + Debug {
    fn name(&self) -> &str;
    fn transform<'a>(&'a self, input: &'a str) -> TransformFuture<'a>;
}

/// Returns its input unchanged. Used when no prefixer is configured.
#[derive(Debug, Clone, Default)]
pub struct PassThrough;

impl Transform for PassThrough {
    fn name(&self) -> &str {
        "pass-through"
    }

    fn transform<'a>(&'a self, input: &'a str) -> TransformFuture<'a> {
        Box::pin(async move { Ok(input.to_string()) })
    }
}

/// Small regex-based CSS minifier.
///
/// Drops comments (keeping `/*! ... */` licence blocks), collapses whitespace,
/// removes spaces around block punctuation and the last `;` in each block.
/// String literals pass through untouched. A space before `:` is kept
/// (`.nav :hover`); only the space after it goes.
#[derive(Debug, Clone)]
pub struct CssMinifier {
    protected: Regex,
    placeholder: Regex,
    whitespace: Regex,
    punctuation: Regex,
    after_colon: Regex,
    trailing_semicolon: Regex,
}

const MARK: char = '\u{1}';

impl CssMinifier {
    pub fn new() -> Result<Self> {
        Ok(Self {
            protected: Regex::new(r#"(?s)"(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'|/\*.*?\*/"#)?,
            placeholder: Regex::new(r"\x01(\d+)\x01")?,
            whitespace: Regex::new(r"\s+")?,
            punctuation: Regex::new(r"\s*([{};,>])\s*")?,
            after_colon: Regex::new(r":\s+")?,
            trailing_semicolon: Regex::new(r";+\}")?,
        })
    }

    pub fn minify(&self, css: &str) -> String {
        let mut kept: Vec<String> = Vec::new();
        let out = self.protected.replace_all(css, |caps: &regex::Captures<'_>| {
            let text = &caps[0];
            if text.starts_with("/*") && !text.starts_with("/*!") {
                return String::new();
            }
            kept.push(text.to_string());
            format!("{MARK}{}{MARK}", kept.len() - 1)
        });

        let out = self.whitespace.replace_all(&out, " ");
        let out = self.punctuation.replace_all(&out, "$1");
        let out = self.after_colon.replace_all(&out, ":");
        let out = self.trailing_semicolon.replace_all(&out, "}");

        self.placeholder
            .replace_all(out.trim(), |caps: &regex::Captures<'_>| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| kept.get(i).cloned())
                    .unwrap_or_default()
            })
            .into_owned()
    }
}

impl Transform for CssMinifier {
    fn name(&self) -> &str {
        "css-minifier"
    }

    fn transform<'a>(&'a self, input: &'a str) -> TransformFuture<'a> {
        Box::pin(async move { Ok(self.minify(input)) })
    }
}

/// Pipes content through an external command (stdin to stdout), e.g.
/// `["npx", "postcss", "--use", "autoprefixer"]`.
#[derive(Debug, Clone)]
pub struct CommandTransform {
    program: String,
    args: Vec<String>,
}

impl CommandTransform {
    pub fn new(command: &[String]) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| anyhow!("transform command is empty"))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl Transform for CommandTransform {
    fn name(&self) -> &str {
        &self.program
    }

    fn transform<'a>(&'a self, input: &'a str) -> TransformFuture<'a> {
        Box::pin(async move {
            let mut child = Command::new(&self.program)
                .args(&self.args)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .with_context(|| format!("spawning transform '{}'", self.program))?;

            if let Some(mut stdin) = child.stdin.take() {
                stdin
                    .write_all(input.as_bytes())
                    .await
                    .with_context(|| format!("writing to '{}'", self.program))?;
                // Dropping stdin closes the pipe so the command sees EOF.
            }

            let output = child
                .wait_with_output()
                .await
                .with_context(|| format!("waiting for '{}'", self.program))?;

            if !output.status.success() {
                bail!(
                    "{} exited with {}: {}",
                    self.program,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
            }

            String::from_utf8(output.stdout)
                .with_context(|| format!("output of '{}' is not UTF-8", self.program))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minifies_and_keeps_licence_comment() {
        let css = "/* layout */\nbody {\n  color: red;\n  margin: 0 auto;\n}\n/*! keep */\n";
        let out = CssMinifier::new().unwrap().minify(css);
        assert_eq!(out, "body{color:red;margin:0 auto}/*! keep */");
    }

    #[test]
    fn keeps_descendant_pseudo_class_and_string_spacing() {
        let css = ".nav :hover { color: red; }\n.a::before { content: \"a  b\"; }\n";
        let out = CssMinifier::new().unwrap().minify(css);
        assert_eq!(out, ".nav :hover{color:red}.a::before{content:\"a  b\"}");
    }

    #[test]
    fn comment_markers_inside_strings_are_not_comments() {
        let css = "a { content: '/* not a comment */' ; }";
        let out = CssMinifier::new().unwrap().minify(css);
        assert_eq!(out, "a{content:'/* not a comment */'}");
    }

    #[test]
    fn drops_empty_comment() {
        let out = CssMinifier::new().unwrap().minify("a{}/**/b{}");
        assert_eq!(out, "a{}b{}");
    }

    #[tokio::test]
    async fn pass_through_is_identity() {
        let out = PassThrough.transform("a { b: c }").await.unwrap();
        assert_eq!(out, "a { b: c }");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_transform_pipes_through_process() {
        let t = CommandTransform::new(&["cat".to_string()]).unwrap();
        let out = t.transform("a{b:c}").await.unwrap();
        assert_eq!(out, "a{b:c}");
    }
}
