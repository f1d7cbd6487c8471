//! CLI 모듈
//!
//! pipeline-console 명령어 정의 및 구현

mod render;

pub use render::{format_bytes, format_latency, format_score, render_highlight, truncate_text};

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use serde_json::Value;

use crate::backend::{
    ApiClient, ChunkingOverrides, CogneeSearchType, CreateJobRequest, DestinationOptions,
    FusionMethod, HippoQaRequest, IngestUrlRequest, JobMode, JobQuery, Priority, RagStrategy,
    SimilarQuery, SourceType, UploadFile, UploadRequest,
};
use crate::calibration::{
    compare, retriever_for, retrievers_for, CalibrationParams, CompareReport, Preset, Strategy,
    StrategyOutcome,
};
use crate::collector::{CollectionStats, CollectorConfig, FileCollector};
use crate::inspector::{self, ChunkView};
use crate::monitor::{self, poll_interval, DeleteTarget, HealthClass, HealthSummary, Selection};
use crate::proxy::{self, ProxyState};
use crate::settings::{default_settings_path, ChunkStrategy, Settings};

use render::MISSING;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "pipeline-console")]
#[command(
    version,
    about = "문서 수집/RAG 파이프라인 컨트롤 플레인 콘솔",
    long_about = None
)]
pub struct Cli {
    /// 설정 파일 경로 (기본: ~/.pipeline-console/settings.json)
    #[arg(long, global = true, value_name = "PATH")]
    pub settings: Option<PathBuf>,

    /// 업스트림 백엔드 URL (설정과 환경변수보다 우선)
    #[arg(long, global = true, value_name = "URL")]
    pub upstream: Option<String>,

    /// X-API-Key 값 (설정과 환경변수보다 우선)
    #[arg(long, global = true, value_name = "KEY")]
    pub api_key: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 백엔드 상태 확인
    Health {
        /// 벡터 스토어 상세 상태도 조회
        #[arg(long)]
        vector: bool,
    },

    /// 구성 요소별 상태 (토폴로지)
    Topology,

    /// 잡 큐 관리
    #[command(subcommand)]
    Jobs(JobsCommand),

    /// 파일 또는 폴더 업로드 (파일마다 잡 생성)
    Upload {
        /// 업로드할 파일/폴더 경로
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// 잡 우선순위
        #[arg(long, value_enum)]
        priority: Option<Priority>,

        /// 이미지 파일 건너뛰기
        #[arg(long)]
        skip_images: bool,

        #[command(flatten)]
        dest: DestinationArgs,

        #[command(flatten)]
        chunking: ChunkingArgs,
    },

    /// URL에서 문서 수집
    IngestUrl {
        /// 수집할 URL
        url: String,

        /// 저장할 파일 이름
        #[arg(long)]
        filename: Option<String>,

        /// 잡 우선순위
        #[arg(long, value_enum)]
        priority: Option<Priority>,

        /// 처리 모드
        #[arg(long, value_enum)]
        mode: Option<JobMode>,

        /// 외부 시스템 ID
        #[arg(long)]
        external_id: Option<String>,

        #[command(flatten)]
        dest: DestinationArgs,

        #[command(flatten)]
        chunking: ChunkingArgs,
    },

    /// 잡의 청크 목록
    Chunks {
        /// 잡 ID
        job_id: String,

        /// 페이지 (1부터)
        #[arg(short, long, default_value = "1")]
        page: u32,

        /// 페이지당 청크 수
        #[arg(short, long, default_value_t = inspector::PAGE_SIZE)]
        limit: u32,

        /// 임베딩 미리보기 포함
        #[arg(long)]
        embeddings: bool,
    },

    /// 특정 청크와 유사한 청크 검색
    Similar {
        /// 기준 청크 ID
        chunk_id: String,

        /// 결과 개수
        #[arg(short = 'k', long)]
        top_k: Option<u32>,

        /// 기준 청크 자신은 제외
        #[arg(long)]
        exclude_self: bool,
    },

    /// 전략 하나로 검색
    Search {
        /// 검색 전략
        #[arg(value_enum)]
        strategy: Strategy,

        /// 검색 쿼리
        query: String,

        #[command(flatten)]
        calibration: CalibrationArgs,
    },

    /// 여러 전략을 동시에 실행해 결과 비교
    Compare {
        /// 검색 쿼리
        query: String,

        /// 비교할 전략 (쉼표 구분)
        #[arg(
            long,
            value_enum,
            value_delimiter = ',',
            default_values = ["text", "hybrid", "semantic"]
        )]
        columns: Vec<Strategy>,

        #[command(flatten)]
        calibration: CalibrationArgs,
    },

    /// RAG 답변 생성
    Rag {
        /// 질문
        query: String,

        /// RAG 전략
        #[arg(long, value_enum, default_value = "balanced")]
        strategy: RagStrategy,

        /// 잡 ID 필터
        #[arg(long)]
        job: Option<String>,
    },

    /// HippoRAG 멀티홉 질의응답
    HippoQa {
        /// 질문
        query: String,

        /// 데이터셋
        #[arg(long)]
        dataset: Option<String>,

        /// 검색할 패시지 수
        #[arg(short = 'k', long)]
        top_k: Option<u32>,
    },

    /// 로컬 설정 관리
    #[command(subcommand)]
    Config(ConfigCommand),

    /// /proxy/* 포워딩 서버 실행
    Serve {
        /// 바인드 주소
        #[arg(long, default_value = "127.0.0.1:3000")]
        bind: SocketAddr,
    },
}

#[derive(Subcommand)]
pub enum JobsCommand {
    /// 잡 목록
    List {
        /// 페이지 (1부터)
        #[arg(short, long, default_value = "1")]
        page: u32,

        /// 페이지당 잡 수
        #[arg(short, long, default_value = "20")]
        limit: u32,

        /// 상태 필터
        #[arg(short, long)]
        status: Option<String>,

        /// 정렬 기준 필드
        #[arg(long)]
        sort_by: Option<String>,

        /// 정렬 순서 (asc, desc)
        #[arg(long)]
        sort_order: Option<String>,
    },

    /// 잡 큐 모니터링 (진행 중이면 3초, 아니면 30초 간격)
    Watch {
        /// 갱신 횟수 (없으면 Ctrl-C까지)
        #[arg(short = 'n', long)]
        iterations: Option<u32>,

        /// 상태 필터
        #[arg(short, long)]
        status: Option<String>,

        /// 표시할 잡 수
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },

    /// 잡 직접 생성
    Create {
        /// 소스 타입
        #[arg(long, value_enum)]
        source_type: SourceType,

        /// 소스 URI
        #[arg(long)]
        uri: String,

        /// 파일 이름
        #[arg(long)]
        file_name: Option<String>,

        /// 잡 우선순위
        #[arg(long, value_enum)]
        priority: Option<Priority>,

        /// 처리 모드
        #[arg(long, value_enum)]
        mode: Option<JobMode>,

        /// 추가 메타데이터 (JSON 객체)
        #[arg(long, value_name = "JSON")]
        metadata: Option<String>,

        /// 외부 시스템 ID
        #[arg(long)]
        external_id: Option<String>,

        #[command(flatten)]
        dest: DestinationArgs,

        #[command(flatten)]
        chunking: ChunkingArgs,
    },

    /// 잡 취소
    Cancel {
        /// 잡 ID
        id: String,
    },

    /// 잡과 모든 청크 영구 삭제
    Delete {
        /// 잡 ID
        id: String,
    },

    /// 여러 잡 일괄 삭제
    BulkDelete {
        /// 잡 ID 목록
        #[arg(required = true)]
        ids: Vec<String>,

        /// 실제로 삭제하지 않고 결과만 확인
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// 현재 설정 표시
    Show,

    /// 설정 값 변경 (api-key, upstream, strategy, chunk-size, overlap)
    Set {
        key: String,
        value: String,
    },

    /// 청크/오버랩 시각화
    Geometry {
        /// 막대 폭 (문자)
        #[arg(long, default_value = "50")]
        width: usize,
    },
}

// ============================================================================
// Shared Arguments
// ============================================================================

/// 그래프 백엔드 목적지 플래그
#[derive(Args, Debug, Clone, Default)]
pub struct DestinationArgs {
    /// Cognee 지식 그래프로도 전송
    #[arg(long)]
    pub cognee: bool,

    /// Cognee 데이터셋 이름
    #[arg(long, value_name = "NAME")]
    pub cognee_dataset: Option<String>,

    /// Cognee 그래프 이름
    #[arg(long, value_name = "NAME")]
    pub cognee_graph: Option<String>,

    /// 자동 cognify 끄기
    #[arg(long)]
    pub no_cognify: bool,

    /// 엔티티 추출 끄기
    #[arg(long)]
    pub no_entities: bool,

    /// 관계 추출 끄기
    #[arg(long)]
    pub no_relationships: bool,

    /// HippoRAG로도 전송
    #[arg(long)]
    pub hipporag: bool,

    /// HippoRAG 데이터셋 이름
    #[arg(long, value_name = "NAME")]
    pub hipporag_dataset: Option<String>,
}

impl DestinationArgs {
    pub fn options(&self) -> DestinationOptions {
        DestinationOptions {
            cognee: self.cognee,
            cognee_dataset: self.cognee_dataset.clone(),
            cognee_graph: self.cognee_graph.clone(),
            auto_cognify: !self.no_cognify,
            extract_entities: !self.no_entities,
            extract_relationships: !self.no_relationships,
            hipporag: self.hipporag,
            hipporag_dataset: self.hipporag_dataset.clone(),
        }
    }
}

/// 청킹 플래그 (없으면 설정값)
#[derive(Args, Debug, Clone, Default)]
pub struct ChunkingArgs {
    /// 청킹 전략 (fixed, recursive, semantic)
    #[arg(long)]
    pub chunk_strategy: Option<ChunkStrategy>,

    /// 청크 크기 (토큰)
    #[arg(long)]
    pub chunk_size: Option<u32>,

    /// 청크 오버랩 (토큰)
    #[arg(long)]
    pub chunk_overlap: Option<u32>,
}

impl ChunkingArgs {
    pub fn overrides(&self) -> ChunkingOverrides {
        ChunkingOverrides {
            strategy: self.chunk_strategy,
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
        }
    }
}

/// 검색 파라미터 플래그
///
/// 프리셋을 먼저 적용하고, 명시한 플래그가 그 위에 덮어씁니다.
#[derive(Args, Debug, Clone, Default)]
pub struct CalibrationArgs {
    /// 프리셋 (fast, balanced, thorough, graphrag)
    #[arg(long, value_enum)]
    pub preset: Option<Preset>,

    /// 결과 개수 (1~100)
    #[arg(short = 'k', long)]
    pub top_k: Option<u32>,

    /// 잡 ID 필터
    #[arg(long)]
    pub job: Option<String>,

    /// 벡터 가중치 (텍스트 = 1 - 벡터)
    #[arg(long)]
    pub vector_weight: Option<f64>,

    /// 텍스트 가중치 (벡터 = 1 - 텍스트)
    #[arg(long, conflicts_with = "vector_weight")]
    pub text_weight: Option<f64>,

    /// 최소 유사도 (0~1)
    #[arg(long)]
    pub min_similarity: Option<f64>,

    /// 점수 결합 방식
    #[arg(long, value_enum)]
    pub fusion: Option<FusionMethod>,

    /// 시맨틱 재정렬 끄기
    #[arg(long)]
    pub no_rerank: bool,

    /// 중복 제거
    #[arg(long)]
    pub dedup: bool,

    /// 주변 문맥 포함
    #[arg(long)]
    pub context: bool,

    /// 시맨틱 열에 /search/semantic 사용 (재정렬/중복 제거/문맥 옵션 적용)
    #[arg(long)]
    pub full_semantic: bool,

    /// Cognee 검색 방식
    #[arg(long, value_enum)]
    pub cognee_type: Option<CogneeSearchType>,

    /// Cognee/HippoRAG 데이터셋
    #[arg(long)]
    pub dataset: Option<String>,
}

impl CalibrationArgs {
    /// 검색 파라미터 생성
    pub fn params(&self) -> CalibrationParams {
        let mut params = CalibrationParams::default();

        if let Some(preset) = self.preset {
            preset.apply(&mut params);
            params.rag_strategy = preset.rag_strategy();
        }

        if let Some(top_k) = self.top_k {
            params.set_top_k(top_k);
        }
        if let Some(job) = &self.job {
            params.job_filter = Some(job.clone());
        }
        if let Some(vector) = self.vector_weight {
            params.weights.set_vector(vector);
        }
        if let Some(text) = self.text_weight {
            params.weights.set_text(text);
        }
        if let Some(min) = self.min_similarity {
            params.set_min_similarity(min);
        }
        if let Some(fusion) = self.fusion {
            params.fusion = fusion;
        }
        if self.no_rerank {
            params.rerank = false;
        }
        if self.dedup {
            params.deduplicate = true;
        }
        if self.context {
            params.include_context = true;
        }
        if self.full_semantic {
            params.semantic_via_text = false;
        }
        if let Some(kind) = self.cognee_type {
            params.cognee_search_type = kind;
        }
        if let Some(dataset) = &self.dataset {
            params.graph_dataset = Some(dataset.clone());
        }

        params
    }
}

// ============================================================================
// Session
// ============================================================================

/// 명령 실행 컨텍스트 (설정 + 오버라이드)
struct Session {
    settings_path: PathBuf,
    settings: Settings,
}

impl Session {
    /// 설정 파일 → 환경변수 → CLI 플래그 순으로 적용
    fn open(path: Option<PathBuf>, upstream: Option<String>, api_key: Option<String>) -> Result<Self> {
        let settings_path = path.unwrap_or_else(default_settings_path);
        let mut settings = Settings::load_with_env(&settings_path)
            .with_context(|| format!("설정 로드 실패: {:?}", settings_path))?;

        if let Some(url) = upstream {
            settings
                .set("upstream", &url)
                .context("--upstream 값이 올바르지 않습니다")?;
        }
        if let Some(key) = api_key {
            settings.set("api-key", &key)?;
        }

        Ok(Self {
            settings_path,
            settings,
        })
    }

    fn client(&self) -> Result<ApiClient> {
        ApiClient::from_settings(&self.settings).context("백엔드 클라이언트 생성 실패")
    }
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    let Cli {
        settings,
        upstream,
        api_key,
        command,
    } = cli;
    let session = Session::open(settings, upstream, api_key)?;

    match command {
        Commands::Health { vector } => cmd_health(&session, vector).await,
        Commands::Topology => cmd_topology(&session).await,
        Commands::Jobs(cmd) => cmd_jobs(&session, cmd).await,
        Commands::Upload {
            paths,
            priority,
            skip_images,
            dest,
            chunking,
        } => cmd_upload(&session, paths, priority, skip_images, &dest, &chunking).await,
        Commands::IngestUrl {
            url,
            filename,
            priority,
            mode,
            external_id,
            dest,
            chunking,
        } => {
            let request = IngestUrlRequest {
                url,
                filename,
                priority,
                mode,
                external_id,
                destinations: dest.options().build(),
                metadata: Some(chunking.overrides().merge_into(None, &session.settings)?),
                ..Default::default()
            };
            cmd_ingest_url(&session, request).await
        }
        Commands::Chunks {
            job_id,
            page,
            limit,
            embeddings,
        } => cmd_chunks(&session, &job_id, page, limit, embeddings).await,
        Commands::Similar {
            chunk_id,
            top_k,
            exclude_self,
        } => cmd_similar(&session, &chunk_id, top_k, exclude_self).await,
        Commands::Search {
            strategy,
            query,
            calibration,
        } => cmd_search(&session, strategy, &query, &calibration).await,
        Commands::Compare {
            query,
            columns,
            calibration,
        } => cmd_compare(&session, &query, &columns, &calibration).await,
        Commands::Rag {
            query,
            strategy,
            job,
        } => cmd_rag(&session, &query, strategy, job).await,
        Commands::HippoQa {
            query,
            dataset,
            top_k,
        } => cmd_hippo_qa(&session, &query, dataset, top_k).await,
        Commands::Config(cmd) => cmd_config(&session, cmd),
        Commands::Serve { bind } => cmd_serve(&session, bind).await,
    }
}

// ============================================================================
// Health
// ============================================================================

/// 상태 확인 명령어
async fn cmd_health(session: &Session, vector: bool) -> Result<()> {
    let client = session.client()?;
    println!("[*] 백엔드 상태 확인: {}", client.base_url());

    let report = client.health().await.context("상태 조회 실패")?;
    let summary = HealthSummary::from_report(&report);
    let class = HealthClass::from_status(&summary.status);

    println!("{} 상태: {}", class.marker(), summary.status);
    if let Some(version) = &summary.version {
        println!("    버전: {}", version);
    }
    if !summary.components.is_empty() {
        println!("    구성 요소: {} 정상", summary.healthy_ratio());
    }

    if vector {
        let detail = client
            .vector_health()
            .await
            .context("벡터 스토어 상태 조회 실패")?;
        println!();
        println!("[*] 벡터 스토어:");
        println!("{}", serde_json::to_string_pretty(&detail)?);
    }

    Ok(())
}

/// 토폴로지 명령어
async fn cmd_topology(session: &Session) -> Result<()> {
    let client = session.client()?;
    let report = client.health().await.context("상태 조회 실패")?;
    let summary = HealthSummary::from_report(&report);

    println!(
        "{} 파이프라인 {} ({} 정상)",
        HealthClass::from_status(&summary.status).marker(),
        summary.status,
        summary.healthy_ratio()
    );

    if summary.components.is_empty() {
        println!("[!] 구성 요소 정보가 없습니다.");
        return Ok(());
    }

    println!();
    for component in &summary.components {
        println!(
            "  {:<4} {:<20} {:<10} {:>8}",
            component.class.marker(),
            component.name,
            component.status,
            format_latency(component.latency_ms)
        );
        if let Some(message) = &component.message {
            println!("       {}", truncate_text(message, 100));
        }
    }

    Ok(())
}

// ============================================================================
// Jobs
// ============================================================================

async fn cmd_jobs(session: &Session, cmd: JobsCommand) -> Result<()> {
    match cmd {
        JobsCommand::List {
            page,
            limit,
            status,
            sort_by,
            sort_order,
        } => {
            let query = JobQuery {
                page: Some(page.max(1)),
                limit: Some(limit),
                status,
                sort_by,
                sort_order,
            };
            cmd_jobs_list(session, &query).await
        }
        JobsCommand::Watch {
            iterations,
            status,
            limit,
        } => {
            let query = JobQuery {
                page: Some(1),
                limit: Some(limit),
                status,
                ..Default::default()
            };
            cmd_jobs_watch(session, &query, iterations).await
        }
        JobsCommand::Create {
            source_type,
            uri,
            file_name,
            priority,
            mode,
            metadata,
            external_id,
            dest,
            chunking,
        } => {
            let base = match metadata.as_deref().map(str::trim) {
                Some(raw) if !raw.is_empty() => Some(parse_metadata(raw)?),
                _ => None,
            };

            let mut request = CreateJobRequest::new(source_type, uri);
            request.file_name = file_name;
            request.priority = priority;
            request.mode = mode;
            request.external_id = external_id;
            request.destinations = dest.options().build();
            request.metadata = Some(chunking.overrides().merge_into(base, &session.settings)?);

            cmd_jobs_create(session, &request).await
        }
        JobsCommand::Cancel { id } => cmd_delete(session, DeleteTarget::cancel(id)).await,
        JobsCommand::Delete { id } => cmd_delete(session, DeleteTarget::hard(id)).await,
        JobsCommand::BulkDelete { ids, dry_run } => cmd_bulk_delete(session, ids, dry_run).await,
    }
}

/// 잡 메타데이터 JSON 파싱
fn parse_metadata(raw: &str) -> Result<Value> {
    serde_json::from_str(raw).map_err(|_| anyhow!("Invalid JSON in metadata field"))
}

async fn cmd_jobs_list(session: &Session, query: &JobQuery) -> Result<()> {
    let client = session.client()?;
    let page = client.list_jobs(query).await.context("잡 목록 조회 실패")?;
    let board = monitor::JobBoard::from_page(&page);

    render::print_jobs(&page, &board);
    Ok(())
}

async fn cmd_jobs_watch(session: &Session, query: &JobQuery, iterations: Option<u32>) -> Result<()> {
    let client = session.client()?;
    println!("[*] 잡 큐 모니터링 시작 (Ctrl-C로 종료)");

    let rounds = monitor::watch(&client, query, iterations, |page, board| {
        println!("[*] {}", Utc::now().format("%H:%M:%S"));
        render::print_jobs(page, board);
        println!("    다음 갱신: {}초 후", poll_interval(&page.items).as_secs());
    })
    .await
    .context("잡 모니터링 실패")?;

    println!("[OK] {} 회 갱신 후 종료", rounds);
    Ok(())
}

async fn cmd_jobs_create(session: &Session, request: &CreateJobRequest) -> Result<()> {
    let client = session.client()?;
    println!("[*] 잡 생성 중: {}", request.source_uri);

    let created = client.create_job(request).await.context("잡 생성 실패")?;

    println!("[OK] 잡이 생성되었습니다 (ID: {})", created.data.id);
    println!("     상태: {}", created.data.status);
    Ok(())
}

async fn cmd_delete(session: &Session, target: DeleteTarget) -> Result<()> {
    let client = session.client()?;
    println!("[*] {}", target.describe());

    target.execute(&client).await.context("잡 삭제 실패")?;

    println!("[OK] 완료: {}", target.id);
    Ok(())
}

async fn cmd_bulk_delete(session: &Session, ids: Vec<String>, dry_run: bool) -> Result<()> {
    let client = session.client()?;
    let selection: Selection = ids.into_iter().collect();

    println!(
        "[*] 잡 {} 개 일괄 삭제{}",
        selection.len(),
        if dry_run { " (dry run)" } else { "" }
    );

    let result = client
        .bulk_delete(&selection.to_request(dry_run))
        .await
        .context("일괄 삭제 실패")?;
    let summary = &result.data.summary;
    let details = &result.data.details;

    println!(
        "[OK] 요청 {}: 삭제 {}, 없음 {}, 실패 {} (청크 {} 개)",
        summary.total_requested,
        summary.jobs_deleted,
        summary.jobs_not_found,
        summary.jobs_failed,
        summary.total_chunks_deleted
    );
    if summary.dry_run {
        println!("    dry run: 실제로 삭제되지 않았습니다.");
    }

    for deleted in &details.deleted {
        println!(
            "    - {} ({} chunks) {}",
            deleted.job_id,
            deleted.chunks,
            deleted.file_name.as_deref().unwrap_or("")
        );
    }
    for id in &details.not_found {
        println!("    [!] 찾을 수 없음: {}", id);
    }
    for failed in &details.failed {
        println!("    [!] {}: {}", failed.job_id, failed.error);
    }

    Ok(())
}

// ============================================================================
// Ingestion
// ============================================================================

/// 파일/폴더 업로드 명령어
async fn cmd_upload(
    session: &Session,
    paths: Vec<PathBuf>,
    priority: Option<Priority>,
    skip_images: bool,
    dest: &DestinationArgs,
    chunking: &ChunkingArgs,
) -> Result<()> {
    let collector = FileCollector::new(CollectorConfig {
        skip_images,
        ..Default::default()
    });

    let files = collector.collect_paths(&paths).context("파일 수집 실패")?;
    if files.is_empty() {
        println!("[!] 업로드할 파일이 없습니다.");
        return Ok(());
    }

    let stats = CollectionStats::from_files(&files);
    println!(
        "[*] 업로드 대상: {} 파일 ({})",
        stats.total_files,
        format_bytes(stats.total_size)
    );
    println!(
        "    문서: {}, 프레젠테이션: {}, 스프레드시트: {}, 텍스트: {}, 이미지: {}",
        stats.documents, stats.presentations, stats.spreadsheets, stats.text_files, stats.images
    );

    let mut uploads = Vec::with_capacity(files.len());
    for file in &files {
        let upload = UploadFile::read(&file.path, file.mime_type)
            .await
            .with_context(|| format!("파일 읽기 실패: {:?}", file.path))?;
        uploads.push(upload);
    }

    let request = UploadRequest {
        files: uploads,
        priority,
        destinations: dest.options().build(),
        metadata: Some(chunking.overrides().merge_into(None, &session.settings)?),
        ..Default::default()
    };

    let client = session.client()?;
    let response = client.upload_files(&request).await.context("업로드 실패")?;

    println!("[OK] 잡 {} 개가 생성되었습니다", response.data.jobs.len());
    for job in &response.data.jobs {
        println!("    - {}  {}", job.id, job.display_name());
    }

    Ok(())
}

/// URL 수집 명령어
async fn cmd_ingest_url(session: &Session, request: IngestUrlRequest) -> Result<()> {
    let client = session.client()?;
    println!("[*] URL 수집 요청: {}", request.url);

    let created = client.ingest_url(&request).await.context("URL 수집 실패")?;

    println!("[OK] 잡이 생성되었습니다 (ID: {})", created.data.id);
    println!("     상태: {}", created.data.status);
    Ok(())
}

// ============================================================================
// Chunks
// ============================================================================

/// 청크 인스펙터 명령어
async fn cmd_chunks(
    session: &Session,
    job_id: &str,
    page: u32,
    limit: u32,
    embeddings: bool,
) -> Result<()> {
    let client = session.client()?;
    let page_index = page.max(1) - 1;

    let chunk_page = inspector::fetch_page(&client, job_id, page_index, limit, embeddings)
        .await
        .context("청크 조회 실패")?;

    println!(
        "[OK] 청크 {} 개 (페이지 {}/{})",
        chunk_page.total,
        page_index + 1,
        inspector::page_count(chunk_page.total, limit)
    );

    if chunk_page.chunks.is_empty() {
        println!("[!] 표시할 청크가 없습니다.");
        return Ok(());
    }

    println!();
    for chunk in &chunk_page.chunks {
        let view = ChunkView::from_chunk(chunk);
        let index = view
            .index
            .map(|i| format!("#{}", i))
            .unwrap_or_else(|| MISSING.to_string());

        println!("  {} {}  (tokens: {})", index, view.id, view.tokens_display());
        println!("      {}", truncate_text(&view.text, 300));
        for (key, value) in &view.metadata {
            println!("      {}: {}", key, value);
        }
        if let Some(preview) = &view.embedding {
            println!("      embedding ({}d): {}", preview.dimensions, preview.render());
        }
    }
    println!();

    if inspector::has_next_page(page_index, limit, chunk_page.total) {
        println!("[*] 다음 페이지: --page {}", page_index + 2);
    }

    Ok(())
}

/// 유사 청크 명령어
async fn cmd_similar(
    session: &Session,
    chunk_id: &str,
    top_k: Option<u32>,
    exclude_self: bool,
) -> Result<()> {
    let client = session.client()?;
    let query = SimilarQuery {
        top_k,
        exclude_self: exclude_self.then_some(true),
    };

    let response = client
        .similar_chunks(chunk_id, &query)
        .await
        .context("유사 청크 조회 실패")?;
    let outcome = StrategyOutcome::from_search(Strategy::Semantic, &response);

    println!(
        "[OK] 유사 청크 {} 개 ({})",
        outcome.hits.len(),
        format_latency(outcome.latency_ms)
    );
    for hit in &outcome.hits {
        render::print_hit(hit);
    }

    Ok(())
}

// ============================================================================
// Search / Compare
// ============================================================================

fn print_classification(report: &CompareReport) {
    if report.classification.is_known() {
        println!("[*] 쿼리 유형: {}", report.classification.badge());
    }
}

/// 단일 전략 검색 명령어
async fn cmd_search(
    session: &Session,
    strategy: Strategy,
    query: &str,
    args: &CalibrationArgs,
) -> Result<()> {
    if query.trim().is_empty() {
        bail!("검색 쿼리를 입력하세요");
    }

    let client = session.client()?;
    let params = args.params();
    let retrievers = [retriever_for(&client, strategy)];

    let report = compare(&retrievers, &params, query).await;
    print_classification(&report);

    for column in &report.columns {
        render::print_column(column);
    }

    match report.columns.into_iter().next().map(|c| c.outcome) {
        Some(Err(e)) => Err(e).with_context(|| format!("{} 검색 실패", strategy.label())),
        _ => Ok(()),
    }
}

/// 전략 비교 명령어
async fn cmd_compare(
    session: &Session,
    query: &str,
    columns: &[Strategy],
    args: &CalibrationArgs,
) -> Result<()> {
    if query.trim().is_empty() {
        bail!("검색 쿼리를 입력하세요");
    }
    if columns.is_empty() {
        bail!("비교할 전략을 하나 이상 지정하세요");
    }

    let client = session.client()?;
    let params = args.params();
    let retrievers = retrievers_for(&client, columns);

    println!("[*] {} 개 전략 동시 실행: \"{}\"", retrievers.len(), query);
    let report = compare(&retrievers, &params, query).await;
    print_classification(&report);
    println!();

    for column in &report.columns {
        render::print_column(column);
    }

    println!(
        "[OK] 성공 {}, 실패 {}",
        report.succeeded(),
        report.failed()
    );

    if report.succeeded() == 0 {
        bail!("모든 전략이 실패했습니다");
    }
    Ok(())
}

// ============================================================================
// Answers
// ============================================================================

/// RAG 답변 명령어
async fn cmd_rag(
    session: &Session,
    query: &str,
    strategy: RagStrategy,
    job: Option<String>,
) -> Result<()> {
    let client = session.client()?;
    let params = CalibrationParams {
        rag_strategy: strategy,
        job_filter: job,
        ..Default::default()
    };

    println!("[*] 답변 생성 중 ({})...", strategy);
    let response = client
        .rag_query(&params.rag_request(query))
        .await
        .context("RAG 질의 실패")?;

    println!();
    println!("{}", response.answer);
    println!();

    if let Some(used) = &response.strategy_used {
        println!("    전략: {}", used);
    }
    if let Some(kind) = &response.query_type {
        println!("    쿼리 유형: {}", kind);
    }
    if let Some(metrics) = &response.metrics {
        println!(
            "    지연: {}, 토큰: {}, 청크: {}/{}",
            format_latency(metrics.latency_ms),
            metrics
                .tokens_used
                .map(|t| t.to_string())
                .unwrap_or_else(|| MISSING.to_string()),
            metrics
                .chunks_used
                .map(|c| c.to_string())
                .unwrap_or_else(|| MISSING.to_string()),
            metrics
                .chunks_retrieved
                .map(|c| c.to_string())
                .unwrap_or_else(|| MISSING.to_string())
        );
    }

    if !response.sources.is_empty() {
        println!();
        println!("[*] 출처 {} 개:", response.sources.len());
        for (i, source) in response.sources.iter().enumerate() {
            println!(
                "  {:>2}. [{}] {}",
                source.rank.unwrap_or(i as u32 + 1),
                format_score(source.similarity_score),
                source.chunk_id.as_deref().unwrap_or(MISSING)
            );
            println!("      {}", truncate_text(&source.content, 200));
        }
    }

    Ok(())
}

/// HippoRAG 질의응답 명령어
async fn cmd_hippo_qa(
    session: &Session,
    query: &str,
    dataset: Option<String>,
    top_k: Option<u32>,
) -> Result<()> {
    if query.trim().is_empty() {
        bail!("질문을 입력하세요");
    }

    let client = session.client()?;
    let request = HippoQaRequest {
        queries: vec![query.to_string()],
        dataset_id: dataset.filter(|d| !d.trim().is_empty()),
        num_to_retrieve: top_k,
        generate_answer: Some(true),
    };

    println!("[*] 멀티홉 질의응답 중...");
    let response = client
        .hipporag_qa(&request)
        .await
        .context("HippoRAG 질의응답 실패")?;

    let Some(result) = response.results.first() else {
        println!("[!] 답변이 없습니다.");
        return Ok(());
    };

    println!();
    println!("{}", result.answer);
    println!();
    println!(
        "    신뢰도: {}, 지연: {}",
        format_score(result.confidence),
        format_latency(response.query_time_ms)
    );

    let passages = &result.retrieval_results;
    if !passages.passages.is_empty() {
        println!();
        println!("[*] 패시지 {} 개:", passages.passages.len());
        for (i, passage) in passages.passages.iter().enumerate() {
            println!(
                "  {:>2}. [{}] {}",
                i + 1,
                format_score(passages.scores.get(i).copied()),
                passages
                    .source_documents
                    .get(i)
                    .map(String::as_str)
                    .unwrap_or(MISSING)
            );
            println!("      {}", truncate_text(passage, 200));
        }
    }

    Ok(())
}

// ============================================================================
// Config
// ============================================================================

fn cmd_config(session: &Session, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show => {
            let settings = &session.settings;
            println!("[*] 설정 파일: {:?}", session.settings_path);
            println!("    업스트림: {}", settings.upstream_url);
            println!("    API 키: {}", settings.masked_api_key());
            println!("    청킹 전략: {}", settings.chunk_strategy);
            println!("    청크 크기: {}", settings.chunk_size);
            println!("    오버랩: {}", settings.chunk_overlap);
            println!("    마지막 저장: {}", settings.last_saved_display());
            Ok(())
        }
        ConfigCommand::Set { key, value } => {
            // 환경변수/플래그 오버라이드가 파일에 섞이지 않도록 원본을 다시 읽음
            let path = &session.settings_path;
            let mut settings = Settings::load(path)
                .with_context(|| format!("설정 로드 실패: {:?}", path))?;

            settings.set(&key, &value)?;
            settings.save(path).context("설정 저장 실패")?;

            println!("[OK] {} 저장됨 ({})", key, settings.last_saved_display());
            Ok(())
        }
        ConfigCommand::Geometry { width } => {
            let settings = &session.settings;
            let geometry = settings.geometry();

            println!(
                "[*] 청크 {} 토큰, 오버랩 {} 토큰 (전진 {} 토큰)",
                geometry.chunk_size,
                geometry.overlap,
                geometry.stride()
            );
            println!("    {}", geometry.render_bar(width));
            println!(
                "    청크 폭 {:.1}%, 오버랩 {:.1}% (청크 대비), 전진 {:.1}%",
                geometry.chunk_width_pct, geometry.overlap_rel_pct, geometry.advance_pct
            );

            if let Err(e) = settings.validate() {
                println!("[!] {}", e);
            }
            Ok(())
        }
    }
}

// ============================================================================
// Serve
// ============================================================================

/// 프록시 서버 명령어
async fn cmd_serve(session: &Session, bind: SocketAddr) -> Result<()> {
    let settings = &session.settings;
    let state = ProxyState::new(&settings.upstream_url, Some(settings.api_key.clone()))
        .context("프록시 초기화 실패")?;

    println!("[*] 프록시 시작: http://{}/proxy -> {}", bind, state.upstream());
    if !settings.has_api_key() {
        println!("[!] API 키가 설정되지 않았습니다. 요청 헤더의 키만 전달됩니다.");
    }

    proxy::serve(state, bind).await.context("프록시 서버 실패")?;

    println!("[OK] 프록시 종료");
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
