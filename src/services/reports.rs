//! Report generation: issue-activity CSV export and the monthly summary.
//!
//! Both run off the request path via `tokio::spawn`; failures are logged
//! and never surfaced to callers.

use crate::{
    error::AppResult,
    repository::{issues::IssueExportRow, Repository},
};

use super::email::EmailService;

#[derive(Clone)]
pub struct ReportsService {
    repository: Repository,
    email: EmailService,
}

/// Aggregates for the monthly activity report
#[derive(Debug, Clone)]
pub struct MonthlyStats {
    pub new_users: i64,
    pub total_requests: i64,
    pub rejected_requests: i64,
    pub total_issues: i64,
    pub books_per_section: Vec<(String, i64)>,
    pub top_books: Vec<(String, i64)>,
}

impl ReportsService {
    pub fn new(repository: Repository, email: EmailService) -> Self {
        Self { repository, email }
    }

    /// Build and email the issue-activity CSV
    pub async fn send_issues_csv(&self) -> AppResult<()> {
        let rows = self.repository.issues.list_for_export().await?;
        let csv = render_issues_csv(&rows);
        let filename = format!("issues-{}.csv", chrono::Utc::now().format("%Y-%m-%d"));

        self.email
            .send_csv_report(self.email.reports_recipient(), &filename, &csv)
            .await
    }

    /// Gather the monthly aggregates
    pub async fn monthly_stats(&self) -> AppResult<MonthlyStats> {
        Ok(MonthlyStats {
            new_users: self.repository.users.count_created_since_days(30).await?,
            total_requests: self.repository.requests.count_all().await?,
            rejected_requests: self.repository.requests.count_rejected().await?,
            total_issues: self.repository.issues.count_all().await?,
            books_per_section: self.repository.sections.book_counts().await?,
            top_books: self.repository.books.top_requested(5).await?,
        })
    }

    /// Build and email the monthly activity report
    pub async fn send_monthly_report(&self) -> AppResult<()> {
        let stats = self.monthly_stats().await?;
        let html = render_monthly_report(&stats);
        self.email
            .send_monthly_report(self.email.reports_recipient(), &html)
            .await
    }
}

/// One CSV row per issue, pipe-separated author/section lists
fn render_issues_csv(rows: &[IssueExportRow]) -> String {
    let mut csv = String::from(
        "issue_id,book_title,book_authors,book_sections,issued_to_user_id,issued_to_user_name,issued_at,returned_at\n",
    );
    for row in rows {
        let returned_at = row
            .returned_at
            .map(|d| d.to_rfc3339())
            .unwrap_or_default();
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            row.id,
            csv_field(&row.book_title),
            csv_field(&row.author_names),
            csv_field(&row.section_names),
            row.user_id,
            csv_field(&row.username),
            row.issued_at.to_rfc3339(),
            returned_at,
        ));
    }
    csv
}

/// Quote a CSV field when it contains a comma, quote, or newline
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn render_monthly_report(stats: &MonthlyStats) -> String {
    let mut sections = String::new();
    for (name, count) in &stats.books_per_section {
        sections.push_str(&format!("<tr><td>{}</td><td>{}</td></tr>", name, count));
    }
    let mut top_books = String::new();
    for (title, requests) in &stats.top_books {
        top_books.push_str(&format!("<tr><td>{}</td><td>{}</td></tr>", title, requests));
    }

    format!(
        r#"<html><body>
<h1>Monthly activity report</h1>
<ul>
  <li>New users (30 days): {new_users}</li>
  <li>Total requests: {total_requests}</li>
  <li>Rejected requests: {rejected_requests}</li>
  <li>Total issues: {total_issues}</li>
</ul>
<h2>Books per section</h2>
<table><tr><th>Section</th><th>Books</th></tr>{sections}</table>
<h2>Top requested books</h2>
<table><tr><th>Title</th><th>Requests</th></tr>{top_books}</table>
</body></html>"#,
        new_users = stats.new_users,
        total_requests = stats.total_requests,
        rejected_requests = stats.rejected_requests,
        total_issues = stats.total_issues,
        sections = sections,
        top_books = top_books,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn export_row() -> IssueExportRow {
        IssueExportRow {
            id: 1,
            book_title: "The Rust Book, Vol. 1".to_string(),
            author_names: "Klabnik|Nichols".to_string(),
            section_names: "Programming".to_string(),
            user_id: 7,
            username: "alice".to_string(),
            issued_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            returned: false,
            returned_at: None,
        }
    }

    #[test]
    fn csv_has_header_and_quotes_commas() {
        let csv = render_issues_csv(&[export_row()]);
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("issue_id,book_title"));
        let row = lines.next().unwrap();
        assert!(row.contains("\"The Rust Book, Vol. 1\""));
        assert!(row.contains("Klabnik|Nichols"));
        // Unreturned issue leaves the last field empty
        assert!(row.ends_with(','));
    }

    #[test]
    fn csv_escapes_embedded_quotes() {
        assert_eq!(csv_field(r#"say "hi""#), r#""say ""hi""""#);
        assert_eq!(csv_field("plain"), "plain");
    }

    #[test]
    fn monthly_report_includes_all_aggregates() {
        let stats = MonthlyStats {
            new_users: 3,
            total_requests: 10,
            rejected_requests: 2,
            total_issues: 5,
            books_per_section: vec![("Fiction".to_string(), 4)],
            top_books: vec![("Dune".to_string(), 6)],
        };
        let html = render_monthly_report(&stats);
        assert!(html.contains("New users (30 days): 3"));
        assert!(html.contains("Rejected requests: 2"));
        assert!(html.contains("<td>Fiction</td><td>4</td>"));
        assert!(html.contains("<td>Dune</td><td>6</td>"));
    }
}
