//! Build trigger endpoint

use crate::LocciClient;
use crate::error::Result;
use locci_core::dto::build::{BuildResponse, StartBuild};

impl LocciClient {
    /// Run the pipeline for a repository branch
    ///
    /// Waits for the whole run. A partial success (image published, export
    /// or notification failed) is returned as `Ok` with
    /// [`BuildStatus::PartialSuccess`](locci_core::dto::build::BuildStatus)
    /// and the failed stages in `errors`.
    pub async fn start_build(&self, req: StartBuild) -> Result<BuildResponse> {
        let url = format!("{}/build", self.base_url);
        tracing::debug!("Triggering build of {}#{}", req.repository, req.branch);
        let response = self.client.post(&url).json(&req).send().await?;

        self.handle_response(response).await
    }
}
