use serde::{Deserialize, Serialize};

/// Knobs for one code generation run. The defaults produce the full output:
/// verified functions, attributed reference parameters, `_t` linkage names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodegenConfig {
    /// Run the IR verifier on every finished function.
    pub verify: bool,
    /// Mark by-reference parameters `dereferenceable(N)` and `nocapture`.
    pub param_attributes: bool,
    pub mangle_prefix: String,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            verify: true,
            param_attributes: true,
            mangle_prefix: "_t".to_string(),
        }
    }
}
