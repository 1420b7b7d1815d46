//! Case generation: inputs × option variants mapped through argument templates.
//!
//! The cross product itself is [`expand`], a pure function over any input and
//! variant types. [`CaseMatrix`] binds it to a manifest group, and
//! [`generate_suite`] concatenates every group in manifest order.

pub mod template;

use crate::case::{Comparison, TestCase};
use crate::config::{GroupConfig, SuiteConfig, VariantConfig};
use crate::core::context::PathHelper;
use crate::core::error::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
pub use template::{TemplateProcessor, TemplateVars, VARIANT_TOKEN};

/// Map every (input, variant) pair through `f`, inputs outermost.
///
/// An empty `variants` slice yields nothing; callers that want a single
/// no-option run pass one empty variant.
pub fn expand<I, V, T, F>(inputs: &[I], variants: &[V], mut f: F) -> Result<Vec<T>>
where
    F: FnMut(&I, &V) -> Result<T>,
{
    let mut out = Vec::with_capacity(inputs.len() * variants.len());
    for input in inputs {
        for variant in variants {
            out.push(f(input, variant)?);
        }
    }
    Ok(out)
}

/// Report id of one generated case: `<group>/<input>[.<tag>]`.
pub fn case_id(group: &str, input: &str, tag: &str) -> String {
    if tag.is_empty() {
        format!("{group}/{input}")
    } else {
        format!("{group}/{input}.{tag}")
    }
}

/// Generator for one manifest group.
pub struct CaseMatrix<'a> {
    group: &'a GroupConfig,
    program: &'a Path,
    paths: &'a PathHelper,
}

impl<'a> CaseMatrix<'a> {
    pub fn new(group: &'a GroupConfig, program: &'a Path, paths: &'a PathHelper) -> Self {
        Self {
            group,
            program,
            paths,
        }
    }

    /// Number of cases [`generate`](Self::generate) will produce.
    pub fn len(&self) -> usize {
        self.group.inputs.len() * self.group.variants.len().max(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build every case of the group.
    pub fn generate(&self) -> Result<Vec<TestCase>> {
        let default_variant = [VariantConfig {
            tag: String::new(),
            args: Vec::new(),
        }];
        let variants: &[VariantConfig] = if self.group.variants.is_empty() {
            &default_variant
        } else {
            &self.group.variants
        };

        expand(&self.group.inputs, variants, |input, variant| {
            self.build_case(input, variant).map_err(|e| match e {
                Error::Template(msg) => Error::Template(format!(
                    "{}: {}",
                    case_id(&self.group.name, input, &variant.tag),
                    msg
                )),
                other => other,
            })
        })
    }

    fn build_case(&self, input: &str, variant: &VariantConfig) -> Result<TestCase> {
        let tp = TemplateProcessor::new(
            TemplateVars {
                input,
                tag: &variant.tag,
            },
            self.paths,
        );

        let args = tp.process_args(&self.group.args, &variant.args)?;
        let mut case = TestCase::new(self.program, args)
            .with_id(case_id(&self.group.name, input, &variant.tag))
            .with_expected_exit_code(self.group.exit_code);

        if let Some(stdin) = &self.group.stdin {
            case = case.with_stdin(tp.process(stdin)?);
        }
        if let Some(stdout) = &self.group.stdout {
            case = case.with_stdout(tp.process(stdout)?);
        }
        if let Some(stderr) = &self.group.stderr {
            case = case.with_stderr(tp.process(stderr)?);
        }

        for cmp in &self.group.compare {
            let comparison =
                Comparison::new(tp.process(cmp.expected())?, tp.process(cmp.actual())?)
                    .with_transforms(cmp.transforms().to_vec());
            case = case.with_comparison(comparison);
        }

        Ok(case)
    }
}

/// Expand every group of `config` in manifest order and check where cases write.
pub fn generate_suite(
    config: &SuiteConfig,
    program: &Path,
    paths: &PathHelper,
) -> Result<Vec<TestCase>> {
    let mut cases = Vec::with_capacity(config.case_count());
    for group in &config.groups {
        let generated = CaseMatrix::new(group, program, paths).generate()?;
        tracing::debug!(group = %group.name, count = generated.len(), "expanded group");
        cases.extend(generated);
    }
    check_output_locations(&cases, paths.temp_dir())?;
    check_unique_outputs(&cases)?;
    Ok(cases)
}

/// Fail if a case writes outside `temp_dir` or onto any comparison's expected file.
pub fn check_output_locations(cases: &[TestCase], temp_dir: &Path) -> Result<()> {
    let golden: HashSet<&Path> = cases
        .iter()
        .flat_map(|case| case.comparisons().iter().map(Comparison::expected))
        .collect();

    for case in cases {
        for output in case.outputs() {
            let inside = output.starts_with(temp_dir)
                && !output.components().any(|c| c == Component::ParentDir);
            if !inside {
                return Err(Error::OutputOutsideTemp {
                    case: case.id().to_string(),
                    path: output.to_path_buf(),
                });
            }
            if golden.contains(output) {
                return Err(Error::OutputIsGolden {
                    case: case.id().to_string(),
                    path: output.to_path_buf(),
                });
            }
        }
    }
    Ok(())
}

/// Fail if two distinct cases write the same file.
///
/// A case may name one file both as a redirect target and as the actual side
/// of a comparison; that is a single writer.
pub fn check_unique_outputs(cases: &[TestCase]) -> Result<()> {
    let mut owners: HashMap<PathBuf, usize> = HashMap::new();
    for (index, case) in cases.iter().enumerate() {
        for output in case.outputs() {
            match owners.get(output) {
                Some(&owner) if owner != index => {
                    return Err(Error::DuplicateOutput(output.to_path_buf()));
                }
                Some(_) => {}
                None => {
                    owners.insert(output.to_path_buf(), index);
                }
            }
        }
    }
    Ok(())
}
