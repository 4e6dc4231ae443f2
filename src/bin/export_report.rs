use opinion_report_core::{ExportError, ReportKind, ReportRequest};
use std::env;
use std::process::ExitCode;

const USAGE: &str = "usage: export_report <report> <conversation-id> [--importance]

reports: votes, participant-votes, participant-importance, participant-xids, summary, comments
database: REPORT_DATABASE_URL (a .env file in the working directory is read)";

fn parse_args(args: &[String]) -> Result<ReportRequest, String> {
    let mut positional = Vec::new();
    let mut include_importance = false;
    for arg in args {
        match arg.as_str() {
            "--importance" => include_importance = true,
            "-h" | "--help" => return Err(USAGE.to_string()),
            other => positional.push(other),
        }
    }

    let [report, conversation] = positional.as_slice() else {
        return Err(USAGE.to_string());
    };
    let kind: ReportKind = report.parse().map_err(|e: ExportError| e.to_string())?;
    let conversation_id: i64 = conversation
        .parse()
        .map_err(|_| format!("conversation id must be an integer, got '{}'", conversation))?;

    let request = ReportRequest::new(conversation_id, kind);
    Ok(if include_importance { request.with_importance() } else { request })
}

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    let request = match parse_args(&args) {
        Ok(request) => request,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::from(2);
        }
    };

    if let Err(e) = opinion_report_core::initialize_from_env().await {
        eprintln!("initialization failed: {}", e);
        return ExitCode::FAILURE;
    }

    let service = match opinion_report_core::get_export_service() {
        Ok(service) => service,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match service.export(&request, tokio::io::stdout()).await {
        Ok(stats) => {
            log::info!("{} rows written to stdout", stats.rows_written);
            ExitCode::SUCCESS
        }
        Err(ExportError::ClientDisconnected) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.user_message());
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parses_report_and_conversation() {
        let request = parse_args(&args(&["votes", "12", "--importance"])).unwrap();
        assert_eq!(request.kind, ReportKind::VotesLog);
        assert_eq!(request.conversation_id, 12);
        assert!(request.include_importance);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(parse_args(&args(&["votes"])).is_err());
        assert!(parse_args(&args(&["votes", "twelve"])).is_err());
        assert!(parse_args(&args(&["everything", "1"])).is_err());
    }
}
