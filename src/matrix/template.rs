use crate::core::context::PathHelper;
use crate::core::error::{Error, Result};
use std::path::Path;

/// Token that expands to the current variant's arguments.
pub const VARIANT_TOKEN: &str = "{variant}";

/// Values bound while expanding one case.
#[derive(Debug, Clone, Copy)]
pub struct TemplateVars<'a> {
    pub input: &'a str,
    pub tag: &'a str,
}

/// Expands argument and path templates for one (input, variant) pair.
///
/// Placeholders:
/// - `{input}`, `{tag}`: the bound values
/// - `{in:NAME}`: `NAME` resolved into the source-tree test data directory
/// - `{out:NAME}`: `NAME` resolved into the private temporary directory
/// - `{tests}`, `{temp}`: those two directories themselves
/// - `{{` and `}}`: literal braces
///
/// `NAME` may itself contain `{input}` and `{tag}`.
pub struct TemplateProcessor<'a> {
    vars: TemplateVars<'a>,
    paths: &'a PathHelper,
}

impl<'a> TemplateProcessor<'a> {
    pub fn new(vars: TemplateVars<'a>, paths: &'a PathHelper) -> Self {
        Self { vars, paths }
    }

    /// Expand a single template string.
    pub fn process(&self, template: &str) -> Result<String> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(pos) = rest.find(['{', '}']) {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if let Some(after) = tail.strip_prefix("{{") {
                out.push('{');
                rest = after;
                continue;
            }
            if let Some(after) = tail.strip_prefix("}}") {
                out.push('}');
                rest = after;
                continue;
            }
            if tail.starts_with('}') {
                return Err(Error::template(format!("unmatched '}}' in '{template}'")));
            }

            let close = matching_brace(tail)
                .ok_or_else(|| Error::template(format!("unterminated '{{' in '{template}'")))?;
            out.push_str(&self.placeholder(&tail[1..close], template)?);
            rest = &tail[close + 1..];
        }

        out.push_str(rest);
        Ok(out)
    }

    /// Expand argument templates; a bare `{variant}` token splices in `variant_args`.
    pub fn process_args(
        &self,
        templates: &[String],
        variant_args: &[String],
    ) -> Result<Vec<String>> {
        let mut args = Vec::with_capacity(templates.len() + variant_args.len());
        for template in templates {
            if template == VARIANT_TOKEN {
                for arg in variant_args {
                    args.push(self.process(arg)?);
                }
            } else {
                args.push(self.process(template)?);
            }
        }
        Ok(args)
    }

    fn placeholder(&self, inner: &str, template: &str) -> Result<String> {
        match inner {
            "input" => return Ok(self.vars.input.to_string()),
            "tag" => return Ok(self.vars.tag.to_string()),
            "tests" => return path_string(&self.paths.tests_path()),
            "temp" => return path_string(self.paths.temp_dir()),
            "variant" => {
                return Err(Error::template(format!(
                    "'{{variant}}' must be a whole argument, found in '{template}'"
                )));
            }
            _ => {}
        }

        if let Some(name) = inner.strip_prefix("in:") {
            let name = self.non_empty(name, template)?;
            return path_string(&self.paths.in_file(&name));
        }
        if let Some(name) = inner.strip_prefix("out:") {
            let name = self.non_empty(name, template)?;
            return path_string(&self.paths.out_file(&name)?);
        }

        Err(Error::template(format!(
            "unknown placeholder '{{{inner}}}' in '{template}'"
        )))
    }

    fn non_empty(&self, name: &str, template: &str) -> Result<String> {
        let name = self.process(name)?;
        if name.is_empty() {
            return Err(Error::template(format!("empty file name in '{template}'")));
        }
        Ok(name)
    }
}

/// Index of the `}` closing the `{` at the start of `s`.
fn matching_brace(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, b) in s.bytes().enumerate() {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn path_string(path: &Path) -> Result<String> {
    path.to_str()
        .map(str::to_string)
        .ok_or_else(|| Error::template(format!("path is not valid UTF-8: {}", path.display())))
}
