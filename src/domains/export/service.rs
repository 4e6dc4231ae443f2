use crate::domains::clustering::repository::ClusteringRepository;
use crate::domains::clustering::resolver::ClusterResolver;
use crate::domains::clustering::types::ClusteringResult;
use crate::domains::conversation::repository::ConversationRepository;
use crate::domains::export::accumulator::{pivot_header, ParticipantRowAccumulator, PivotMode, StreamOrdering};
use crate::domains::export::csv_record::{CsvRecord, VoteLogRecord};
use crate::domains::export::summary::ConversationSummary;
use crate::domains::export::types::{ExportError, ExportStats, ReportKind, ReportRequest};
use crate::domains::export::writers::csv_writer::{CsvConfig, CsvStreamWriter};
use crate::domains::statement::repository::StatementRepository;
use crate::domains::statement::types::{StatementColumns, StatementSummary};
use crate::domains::conversation::types::ParticipantXid;
use crate::domains::vote::consumer::{drive, VoteConsumer};
use crate::domains::vote::repository::{VoteStream, VoteStreamReader};
use crate::domains::vote::types::VoteRecord;
use crate::types::ConversationId;
use async_trait::async_trait;
use futures::StreamExt;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncWrite;

/// Produces every report variant into a caller-supplied sink.
///
/// Each call reads its own clustering snapshot and opens its own vote
/// cursor; nothing is shared between concurrent exports except the
/// repositories.
pub struct ExportService {
    conversations: Arc<dyn ConversationRepository>,
    statements: Arc<dyn StatementRepository>,
    clustering: Arc<dyn ClusteringRepository>,
    votes: Arc<dyn VoteStreamReader>,
    csv_config: CsvConfig,
    conversation_url_base: Option<String>,
}

impl std::fmt::Debug for ExportService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportService")
            .field("conversations", &"<ConversationRepository>")
            .field("statements", &"<StatementRepository>")
            .field("clustering", &"<ClusteringRepository>")
            .field("votes", &"<VoteStreamReader>")
            .field("csv_config", &self.csv_config)
            .field("conversation_url_base", &self.conversation_url_base)
            .finish()
    }
}

impl ExportService {
    pub fn new(
        conversations: Arc<dyn ConversationRepository>,
        statements: Arc<dyn StatementRepository>,
        clustering: Arc<dyn ClusteringRepository>,
        votes: Arc<dyn VoteStreamReader>,
    ) -> Self {
        Self {
            conversations,
            statements,
            clustering,
            votes,
            csv_config: CsvConfig::default(),
            conversation_url_base: None,
        }
    }

    pub fn with_csv_config(mut self, csv_config: CsvConfig) -> Self {
        self.csv_config = csv_config;
        self
    }

    pub fn with_conversation_url_base(mut self, url_base: Option<String>) -> Self {
        self.conversation_url_base = url_base;
        self
    }

    /// Write one report to `sink`.
    ///
    /// Failures found before anything is written come back as they are and
    /// leave the sink empty. Once output has started a failure is logged,
    /// the sink is flushed, and the call returns `Truncated` (or
    /// `ClientDisconnected` when the sink went away).
    pub async fn export<W>(&self, request: &ReportRequest, sink: W) -> Result<ExportStats, ExportError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let started = Instant::now();
        log::info!(
            "Starting {} export for conversation {}",
            request.kind, request.conversation_id
        );

        let mut writer = CsvStreamWriter::new(sink, self.csv_config.clone());
        let outcome = match request.kind {
            ReportKind::VotesLog => self.export_votes_log(request, &mut writer).await,
            ReportKind::ParticipantVotes => {
                self.export_pivot(request.conversation_id, PivotMode::Votes, &mut writer).await
            }
            ReportKind::ParticipantImportance => {
                self.export_pivot(request.conversation_id, PivotMode::Importance, &mut writer).await
            }
            ReportKind::ParticipantXids => self.export_xids(request.conversation_id, &mut writer).await.map(|_| 0),
            ReportKind::Summary => self.export_summary(request.conversation_id, &mut writer).await.map(|_| 0),
            ReportKind::Comments => self.export_comments(request.conversation_id, &mut writer).await.map(|_| 0),
        };

        let votes_read = match outcome {
            Ok(votes_read) => votes_read,
            Err(error) => return Err(abort(request, &mut writer, error).await),
        };

        let writer_stats = match writer.close().await {
            Ok(stats) => stats,
            Err(error) => return Err(abort(request, &mut writer, error).await),
        };

        let stats = ExportStats {
            rows_written: writer_stats.rows_written,
            bytes_written: writer_stats.bytes_written,
            votes_read,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        log::info!(
            "Finished {} export for conversation {}: {} rows, {} bytes, {} votes in {}ms",
            request.kind,
            request.conversation_id,
            stats.rows_written,
            stats.bytes_written,
            stats.votes_read,
            stats.duration_ms
        );
        Ok(stats)
    }

    async fn export_votes_log<W>(
        &self,
        request: &ReportRequest,
        writer: &mut CsvStreamWriter<W>,
    ) -> Result<u64, ExportError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        self.conversations.find_by_id(request.conversation_id).await?;
        let votes = self.open_votes(request.conversation_id).await?;

        writer.write_header(VoteLogRecord::headers(request.include_importance)).await?;
        let mut sink = VotesLogSink {
            writer,
            include_importance: request.include_importance,
        };
        drive(votes, &mut sink).await
    }

    async fn export_pivot<W>(
        &self,
        conversation_id: ConversationId,
        mode: PivotMode,
        writer: &mut CsvStreamWriter<W>,
    ) -> Result<u64, ExportError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        self.conversations.find_by_id(conversation_id).await?;
        let clustering = self.require_clustering(conversation_id).await?;
        let resolver = ClusterResolver::build(&clustering);
        let columns = self.statements.index(conversation_id).await?;

        let ordering = if self.votes.guarantees_order() {
            StreamOrdering::Sorted
        } else {
            log::warn!(
                "Vote source for conversation {} is unordered, buffering rows per participant",
                conversation_id
            );
            StreamOrdering::Unsorted
        };

        log::debug!(
            "Pivot export for conversation {}: {} statement columns, {} groups",
            conversation_id,
            columns.len(),
            resolver.group_count()
        );

        let votes = self.open_votes(conversation_id).await?;
        writer.write_header(pivot_header(mode, &columns)).await?;
        let mut sink = PivotSink {
            writer,
            accumulator: ParticipantRowAccumulator::new(&columns, &resolver, ordering),
            columns: &columns,
            mode,
        };
        drive(votes, &mut sink).await
    }

    async fn export_xids<W>(&self, conversation_id: ConversationId, writer: &mut CsvStreamWriter<W>) -> Result<(), ExportError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        self.conversations.find_by_id(conversation_id).await?;
        let clustering = self.require_clustering(conversation_id).await?;
        let resolver = ClusterResolver::build(&clustering);
        let xids = self.conversations.participant_xids(conversation_id).await?;

        writer.write_header(ParticipantXid::headers()).await?;
        for xid in xids.iter().filter(|x| resolver.is_in_conversation(x.participant_id)) {
            writer.write_row(xid.to_csv()).await?;
        }
        Ok(())
    }

    async fn export_summary<W>(&self, conversation_id: ConversationId, writer: &mut CsvStreamWriter<W>) -> Result<(), ExportError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let conversation = self.conversations.find_by_id(conversation_id).await?;
        let clustering = self.require_clustering(conversation_id).await?;
        let statement_count = self.statements.count_all(conversation_id).await?;
        let author_count = self.statements.count_authors(conversation_id).await?;

        let summary = ConversationSummary::build(
            &conversation,
            &clustering,
            statement_count,
            author_count,
            self.conversation_url_base.as_deref(),
        );
        for row in summary.rows() {
            writer.write_row(row).await?;
        }
        Ok(())
    }

    async fn export_comments<W>(&self, conversation_id: ConversationId, writer: &mut CsvStreamWriter<W>) -> Result<(), ExportError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        self.conversations.find_by_id(conversation_id).await?;
        let summaries = self.statements.summaries(conversation_id).await?;

        writer.write_header(StatementSummary::headers()).await?;
        for summary in &summaries {
            writer.write_row(summary.to_csv()).await?;
        }
        Ok(())
    }

    /// Open the vote cursor and wait for its first item, so a query that
    /// fails outright is reported before the header goes out.
    async fn open_votes(&self, conversation_id: ConversationId) -> Result<VoteStream, ExportError> {
        let mut votes = self.votes.stream(conversation_id).peekable();
        let fails_at_once = matches!(Pin::new(&mut votes).peek().await, Some(Err(_)));
        if fails_at_once {
            if let Some(Err(e)) = votes.next().await {
                log::warn!("Vote query for conversation {} failed before any row: {}", conversation_id, e);
                return Err(e.into());
            }
        }
        Ok(Box::pin(votes))
    }

    async fn require_clustering(&self, conversation_id: ConversationId) -> Result<ClusteringResult, ExportError> {
        match self.clustering.latest_for_conversation(conversation_id).await? {
            Some(result) => Ok(result),
            None => {
                log::info!("No clustering result yet for conversation {}", conversation_id);
                Err(ExportError::UpstreamDataUnavailable { conversation_id })
            }
        }
    }
}

/// Turn a failure into the caller-facing error, depending on whether the
/// sink has already seen output.
async fn abort<W>(request: &ReportRequest, writer: &mut CsvStreamWriter<W>, error: ExportError) -> ExportError
where
    W: AsyncWrite + Unpin + Send,
{
    if !writer.header_written() && writer.rows_written() == 0 {
        log::warn!(
            "{} export for conversation {} failed before output: {}",
            request.kind, request.conversation_id, error
        );
        return error;
    }

    if error.is_client_disconnect() {
        log::info!(
            "Client disconnected during {} export for conversation {} after {} rows",
            request.kind,
            request.conversation_id,
            writer.rows_written()
        );
        return error;
    }

    log::error!(
        "{} export for conversation {} failed after {} rows: {}",
        request.kind,
        request.conversation_id,
        writer.rows_written(),
        error
    );
    if let Err(flush_error) = writer.flush().await {
        if flush_error.is_client_disconnect() {
            return flush_error;
        }
        log::warn!("Flush after failed export also failed: {}", flush_error);
    }

    ExportError::Truncated {
        rows_written: writer.rows_written(),
        reason: error.to_string(),
    }
}

/// Writes each vote as soon as it arrives
struct VotesLogSink<'w, W: AsyncWrite + Unpin + Send> {
    writer: &'w mut CsvStreamWriter<W>,
    include_importance: bool,
}

#[async_trait]
impl<'w, W: AsyncWrite + Unpin + Send> VoteConsumer for VotesLogSink<'w, W> {
    type Error = ExportError;

    async fn on_row(&mut self, vote: VoteRecord) -> Result<(), ExportError> {
        let record = VoteLogRecord {
            vote: &vote,
            include_importance: self.include_importance,
        };
        self.writer.write_row(record.to_csv()).await
    }

    async fn on_complete(&mut self) -> Result<(), ExportError> {
        Ok(())
    }

    async fn on_error(&mut self, error: &ExportError) {
        log::debug!("Votes log stream stopped: {}", error);
    }
}

/// Folds votes into pivot rows and writes each row once it is complete
struct PivotSink<'a, W: AsyncWrite + Unpin + Send> {
    writer: &'a mut CsvStreamWriter<W>,
    accumulator: ParticipantRowAccumulator<'a>,
    columns: &'a StatementColumns,
    mode: PivotMode,
}

#[async_trait]
impl<'a, W: AsyncWrite + Unpin + Send> VoteConsumer for PivotSink<'a, W> {
    type Error = ExportError;

    async fn on_row(&mut self, vote: VoteRecord) -> Result<(), ExportError> {
        if let Some(row) = self.accumulator.on_vote_row(&vote)? {
            self.writer.write_row(row.to_fields(self.mode, self.columns)).await?;
        }
        Ok(())
    }

    async fn on_complete(&mut self) -> Result<(), ExportError> {
        for row in self.accumulator.finalize() {
            self.writer.write_row(row.to_fields(self.mode, self.columns)).await?;
        }
        Ok(())
    }

    async fn on_error(&mut self, error: &ExportError) {
        // The in-progress row is dropped with the accumulator
        log::debug!("Pivot stream stopped: {}", error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::clustering::repository::SqliteClusteringRepository;
    use crate::domains::conversation::repository::SqliteConversationRepository;
    use crate::domains::statement::repository::SqliteStatementRepository;
    use crate::domains::vote::repository::{MemoryVoteReader, SqliteVoteRepository};
    use crate::errors::{DbError, DomainError};
    use crate::test_support::{
        insert_clustering, insert_conversation, insert_statement, insert_vote, insert_xid, memory_pool,
    };
    use futures::stream;
    use sqlx::SqlitePool;
    use std::io;
    use std::task::{Context, Poll};

    const SCENARIO_CLUSTERING: &str = r#"{
        "participants_in_conversation": [1, 2, 3],
        "base_clusters": [{"id": 1, "members": [1]}, {"id": 2, "members": [2]}],
        "opinion_groups": [{"id": 1, "members": [1]}, {"id": 2, "members": [2]}],
        "vote_counts_per_participant": {"1": 2, "2": 1}
    }"#;

    async fn seed_scenario(pool: &SqlitePool) {
        insert_conversation(pool, 1, "Transit", "How should the city move?").await;
        insert_statement(pool, 1, 1, 1, "More buses", 1, 0).await;
        insert_statement(pool, 1, 2, 1, "Fewer cars", 1, 1).await;
        insert_statement(pool, 1, 3, 2, "Bike lanes, please", 1, 0).await;
        insert_vote(pool, 1, 1, 1, -1, false, 1_704_067_200_000).await;
        insert_vote(pool, 1, 1, 2, 1, true, 1_704_067_201_000).await;
        insert_vote(pool, 1, 2, 3, -1, false, 1_704_067_202_000).await;
        insert_xid(pool, 1, 1, "alice").await;
        insert_xid(pool, 1, 2, "bob").await;
        insert_xid(pool, 1, 7, "not-in-conv").await;
    }

    fn service_with_votes(pool: &SqlitePool, votes: Arc<dyn VoteStreamReader>) -> ExportService {
        ExportService::new(
            Arc::new(SqliteConversationRepository::new(pool.clone())),
            Arc::new(SqliteStatementRepository::new(pool.clone())),
            Arc::new(SqliteClusteringRepository::new(pool.clone())),
            votes,
        )
    }

    fn service(pool: &SqlitePool) -> ExportService {
        service_with_votes(pool, Arc::new(SqliteVoteRepository::new(pool.clone()).with_batch_size(2)))
    }

    async fn export_to_string(
        service: &ExportService,
        request: ReportRequest,
    ) -> (Result<ExportStats, ExportError>, String) {
        let mut out = Vec::new();
        let result = service.export(&request, &mut out).await;
        (result, String::from_utf8(out).unwrap())
    }

    struct FailingReader {
        good_rows: Vec<VoteRecord>,
    }

    impl VoteStreamReader for FailingReader {
        fn stream(&self, _conversation_id: ConversationId) -> VoteStream {
            let mut items: Vec<Result<VoteRecord, DomainError>> = self.good_rows.iter().copied().map(Ok).collect();
            items.push(Err(DomainError::Database(DbError::Query("cursor lost".to_string()))));
            Box::pin(stream::iter(items))
        }
    }

    struct BrokenPipe;

    impl AsyncWrite for BrokenPipe {
        fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, _buf: &[u8]) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::from(io::ErrorKind::BrokenPipe)))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_participant_votes_scenario() {
        let pool = memory_pool().await;
        seed_scenario(&pool).await;
        insert_clustering(&pool, 1, 1, SCENARIO_CLUSTERING).await;

        let (result, csv) =
            export_to_string(&service(&pool), ReportRequest::new(1, ReportKind::ParticipantVotes)).await;
        let stats = result.unwrap();
        assert_eq!(
            csv,
            "participant,group-id,n-comments,n-votes,n-agree,n-disagree,1,2,3\n\
             1,1,2,2,1,1,1,-1,\n\
             2,2,1,1,1,0,,,1\n"
        );
        assert_eq!(stats.rows_written, 2);
        assert_eq!(stats.votes_read, 3);
    }

    #[tokio::test]
    async fn test_participant_importance_matrix() {
        let pool = memory_pool().await;
        seed_scenario(&pool).await;
        insert_clustering(&pool, 1, 1, SCENARIO_CLUSTERING).await;

        let (result, csv) =
            export_to_string(&service(&pool), ReportRequest::new(1, ReportKind::ParticipantImportance)).await;
        result.unwrap();
        assert_eq!(
            csv,
            "participant,group-id,n-comments,n-votes,n-important,1,2,3\n\
             1,1,2,2,1,0,1,\n\
             2,2,1,1,0,,,0\n"
        );
    }

    #[tokio::test]
    async fn test_votes_log_with_importance() {
        let pool = memory_pool().await;
        seed_scenario(&pool).await;

        let request = ReportRequest::new(1, ReportKind::VotesLog).with_importance();
        let (result, csv) = export_to_string(&service(&pool), request).await;
        assert_eq!(result.unwrap().rows_written, 3);

        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "timestamp,datetime,comment-id,voter-id,vote,important");
        assert_eq!(
            lines[1],
            "1704067200,Mon Jan 01 2024 00:00:00 GMT+0000 (Coordinated Universal Time),1,1,1,0"
        );
        assert!(lines[2].ends_with(",2,1,-1,1"));
        assert_eq!(lines.len(), 4);
    }

    #[tokio::test]
    async fn test_xids_limited_to_participants_in_conversation() {
        let pool = memory_pool().await;
        seed_scenario(&pool).await;
        insert_clustering(&pool, 1, 1, SCENARIO_CLUSTERING).await;

        let (result, csv) =
            export_to_string(&service(&pool), ReportRequest::new(1, ReportKind::ParticipantXids)).await;
        result.unwrap();
        assert_eq!(csv, "participant,xid\n1,alice\n2,bob\n");
    }

    #[tokio::test]
    async fn test_conversation_summary() {
        let pool = memory_pool().await;
        seed_scenario(&pool).await;
        insert_clustering(&pool, 1, 1, SCENARIO_CLUSTERING).await;

        let service = service(&pool).with_conversation_url_base(Some("https://example.org".to_string()));
        let (result, csv) = export_to_string(&service, ReportRequest::new(1, ReportKind::Summary)).await;
        result.unwrap();
        assert_eq!(
            csv,
            "topic,Transit\n\
             url,https://example.org/1\n\
             voters,2\n\
             voters-in-conv,3\n\
             commenters,2\n\
             comments,3\n\
             groups,2\n\
             conversation-description,How should the city move?\n"
        );
    }

    #[tokio::test]
    async fn test_comments_report_quotes_bodies() {
        let pool = memory_pool().await;
        seed_scenario(&pool).await;

        let (result, csv) = export_to_string(&service(&pool), ReportRequest::new(1, ReportKind::Comments)).await;
        result.unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "timestamp,datetime,comment-id,author-id,agrees,disagrees,moderated,comment-body");
        assert!(lines[3].ends_with(",3,2,1,0,0,\"Bike lanes, please\""));
    }

    #[tokio::test]
    async fn test_missing_clustering_writes_nothing() {
        let pool = memory_pool().await;
        seed_scenario(&pool).await;

        for kind in [ReportKind::ParticipantVotes, ReportKind::ParticipantXids, ReportKind::Summary] {
            let (result, csv) = export_to_string(&service(&pool), ReportRequest::new(1, kind)).await;
            let err = result.unwrap_err();
            assert!(matches!(err, ExportError::UpstreamDataUnavailable { conversation_id: 1 }));
            assert!(err.user_message().starts_with("Not enough data yet"));
            assert!(csv.is_empty());
        }
    }

    #[tokio::test]
    async fn test_unknown_conversation_is_not_found() {
        let pool = memory_pool().await;
        let (result, csv) = export_to_string(&service(&pool), ReportRequest::new(42, ReportKind::VotesLog)).await;
        assert!(matches!(result.unwrap_err(), ExportError::NotFound(_)));
        assert!(csv.is_empty());
    }

    #[tokio::test]
    async fn test_columns_present_without_votes() {
        let pool = memory_pool().await;
        insert_conversation(&pool, 1, "Quiet", "").await;
        insert_statement(&pool, 1, 4, 1, "a", 1, 0).await;
        insert_statement(&pool, 1, 9, 1, "b", 1, 0).await;
        insert_clustering(&pool, 1, 1, "{}").await;

        let (result, csv) =
            export_to_string(&service(&pool), ReportRequest::new(1, ReportKind::ParticipantVotes)).await;
        assert_eq!(result.unwrap().rows_written, 0);
        assert_eq!(csv, "participant,group-id,n-comments,n-votes,n-agree,n-disagree,4,9\n");
    }

    #[tokio::test]
    async fn test_mid_stream_failure_truncates() {
        let pool = memory_pool().await;
        seed_scenario(&pool).await;
        insert_clustering(&pool, 1, 1, SCENARIO_CLUSTERING).await;

        let reader = Arc::new(FailingReader {
            good_rows: vec![VoteRecord::new(1, 1, -1), VoteRecord::new(2, 3, -1)],
        });
        let service = service_with_votes(&pool, reader);

        let (result, csv) = export_to_string(&service, ReportRequest::new(1, ReportKind::ParticipantVotes)).await;
        match result.unwrap_err() {
            ExportError::Truncated { rows_written, reason } => {
                assert_eq!(rows_written, 1);
                assert!(reason.contains("cursor lost"));
            }
            other => panic!("expected truncation, got {:?}", other),
        }
        // Participant 2's row was still in progress and is never written
        assert_eq!(
            csv,
            "participant,group-id,n-comments,n-votes,n-agree,n-disagree,1,2,3\n1,1,2,1,1,0,1,,\n"
        );
    }

    #[tokio::test]
    async fn test_vote_query_failing_at_once_writes_nothing() {
        let pool = memory_pool().await;
        seed_scenario(&pool).await;
        insert_clustering(&pool, 1, 1, SCENARIO_CLUSTERING).await;

        let service = service_with_votes(&pool, Arc::new(FailingReader { good_rows: Vec::new() }));
        for kind in [ReportKind::VotesLog, ReportKind::ParticipantVotes, ReportKind::ParticipantImportance] {
            let (result, csv) = export_to_string(&service, ReportRequest::new(1, kind)).await;
            match result.unwrap_err() {
                ExportError::Query(message) => assert_eq!(message, "cursor lost"),
                other => panic!("expected a query error, got {:?}", other),
            }
            assert!(csv.is_empty());
        }
    }

    #[tokio::test]
    async fn test_malformed_vote_row_truncates_the_export() {
        let pool = memory_pool().await;
        seed_scenario(&pool).await;
        sqlx::query(
            "INSERT INTO votes (conversation_id, pid, tid, vote, high_priority, created) VALUES (1, 3, 1, 1, 0, 'garbage')"
        )
        .execute(&pool)
        .await
        .unwrap();

        let service = service_with_votes(&pool, Arc::new(SqliteVoteRepository::new(pool.clone()).with_batch_size(1)));
        let (result, csv) = export_to_string(&service, ReportRequest::new(1, ReportKind::VotesLog)).await;
        match result.unwrap_err() {
            ExportError::Truncated { rows_written, reason } => {
                assert_eq!(rows_written, 3);
                assert!(reason.contains("malformed vote row"));
            }
            other => panic!("expected truncation, got {:?}", other),
        }
        assert_eq!(csv.lines().count(), 4);
    }

    #[tokio::test]
    async fn test_broken_pipe_is_client_disconnect() {
        let pool = memory_pool().await;
        seed_scenario(&pool).await;

        let err = service(&pool)
            .export(&ReportRequest::new(1, ReportKind::VotesLog), BrokenPipe)
            .await
            .unwrap_err();
        assert!(err.is_client_disconnect());
    }

    #[tokio::test]
    async fn test_unordered_reader_uses_buffered_fallback() {
        let pool = memory_pool().await;
        seed_scenario(&pool).await;
        insert_clustering(&pool, 1, 1, SCENARIO_CLUSTERING).await;

        let reader = Arc::new(MemoryVoteReader::unordered(vec![
            VoteRecord::new(2, 3, -1),
            VoteRecord::new(1, 2, 1),
            VoteRecord::new(1, 1, -1),
        ]));
        let service = service_with_votes(&pool, reader);

        let (result, csv) = export_to_string(&service, ReportRequest::new(1, ReportKind::ParticipantVotes)).await;
        result.unwrap();
        assert!(csv.ends_with("1,1,2,2,1,1,1,-1,\n2,2,1,1,1,0,,,1\n"));
    }

    #[tokio::test]
    async fn test_export_to_file() {
        let pool = memory_pool().await;
        seed_scenario(&pool).await;
        insert_clustering(&pool, 1, 1, SCENARIO_CLUSTERING).await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ReportKind::ParticipantVotes.file_name());
        let file = tokio::fs::File::create(&path).await.unwrap();

        service(&pool)
            .export(&ReportRequest::new(1, ReportKind::ParticipantVotes), file)
            .await
            .unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.lines().count(), 3);
        assert!(written.contains("2,2,1,1,1,0,,,1"));
    }
}
