use serde_json::Value as JsonValue;

use super::TrackerApi;
use super::models::ReportQuery;
use crate::error::Error;
use crate::pipeline::ApiRequest;
use crate::transport::Transport;

impl<T: Transport> TrackerApi<T> {
    /// Run a report. Rows are returned as the API shapes them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] without sending anything if the query is
    /// incomplete.
    pub async fn report(&self, query: &ReportQuery) -> Result<Vec<JsonValue>, Error> {
        let request = query
            .to_pairs()?
            .into_iter()
            .fold(ApiRequest::get("/reports"), |req, (k, v)| req.query(k, v));
        self.fetch(request).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::pipeline::ApiClient;
    use crate::resources::ReportKind;
    use crate::session::SessionStore;
    use crate::testing::{Reply, ScriptedTransport};
    use crate::transport::Method;

    #[tokio::test]
    async fn report_sends_query_pairs() {
        let transport = ScriptedTransport::new();
        let api = TrackerApi::new(ApiClient::new(transport.clone(), SessionStore::in_memory()));
        transport.reply(Method::Get, "/reports", Reply::json(200, json!([{ "project": "A" }])));

        let rows = api
            .report(&ReportQuery::new(ReportKind::ProjectsByUser).with_value("4"))
            .await
            .unwrap();

        assert_eq!(rows, vec![json!({ "project": "A" })]);
        assert_eq!(
            transport.calls()[0].query,
            vec![
                ("type".to_string(), "projects_by_user".to_string()),
                ("value".to_string(), "4".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn invalid_report_sends_nothing() {
        let transport = ScriptedTransport::new();
        let api = TrackerApi::new(ApiClient::new(transport.clone(), SessionStore::in_memory()));

        let err = api
            .report(&ReportQuery::new(ReportKind::ProjectDurationByMilestone))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert!(transport.calls().is_empty());
    }
}
