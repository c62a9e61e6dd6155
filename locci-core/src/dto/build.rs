//! Build DTOs for the trigger interface

use serde::{Deserialize, Serialize};

use crate::domain::build::{BuildRecipe, SourceReference};
use crate::domain::event::CompletionEvent;
use crate::domain::pipeline::StageFailure;

fn default_branch() -> String {
    "main".to_string()
}

/// Request to start a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartBuild {
    pub repository: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe: Option<RecipeOverrides>,
}

impl StartBuild {
    pub fn source(&self) -> SourceReference {
        SourceReference::new(self.repository.clone(), self.branch.clone())
    }
}

/// Per-request overrides of the server's default build recipe
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workdir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<Vec<Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serve_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<Vec<String>>,
}

impl RecipeOverrides {
    /// Applies the overrides on top of `base`
    pub fn apply(self, base: &BuildRecipe) -> BuildRecipe {
        BuildRecipe {
            build_image: self.build_image.unwrap_or_else(|| base.build_image.clone()),
            workdir: self.workdir.unwrap_or_else(|| base.workdir.clone()),
            commands: self.commands.unwrap_or_else(|| base.commands.clone()),
            output_dir: self.output_dir.unwrap_or_else(|| base.output_dir.clone()),
            runtime_image: self
                .runtime_image
                .unwrap_or_else(|| base.runtime_image.clone()),
            serve_dir: self.serve_dir.unwrap_or_else(|| base.serve_dir.clone()),
            entrypoint: self.entrypoint.unwrap_or_else(|| base.entrypoint.clone()),
        }
    }
}

/// Outcome class of a pipeline run as seen by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    Completed,
    PartialSuccess,
}

/// Response body of a run that published an image
///
/// Runs that failed before publishing return an [`ErrorBody`](super::ErrorBody)
/// instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResponse {
    pub status: BuildStatus,
    /// Resolved registry reference of the published image
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<CompletionEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_path: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<StageFailure>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_defaults_to_main() {
        let req: StartBuild =
            serde_json::from_str(r#"{"repository":"https://github.com/example/app"}"#).unwrap();
        assert_eq!(req.branch, "main");
        assert!(req.recipe.is_none());
    }

    #[test]
    fn test_overrides_replace_only_given_fields() {
        let base = BuildRecipe::default();
        let overrides = RecipeOverrides {
            output_dir: Some("/app/build".to_string()),
            commands: Some(vec![vec!["yarn".to_string(), "build".to_string()]]),
            ..Default::default()
        };

        let recipe = overrides.apply(&base);
        assert_eq!(recipe.output_dir, "/app/build");
        assert_eq!(recipe.commands, vec![vec!["yarn", "build"]]);
        assert_eq!(recipe.build_image, base.build_image);
        assert_eq!(recipe.entrypoint, base.entrypoint);
    }
}
