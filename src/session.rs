use log::{debug, warn};

use crate::commit::{CommitCoordinator, RecipeStore};
use crate::draft::DraftStore;
use crate::error::{CommitError, ExtractWarning, ScanError, Stage};
use crate::extract::Extractor;
use crate::fetch::SourceFetcher;
use crate::model::ScanRequest;

/// Where a scan session currently stands.
///
/// `Reviewing` is the only state that accepts user-driven edits; every
/// other transition is owned by the pipeline. A failure keeps the stage
/// it happened in so the caller can show a specific message.
#[derive(Debug)]
pub enum SessionState {
    Idle,
    Fetching,
    Extracting,
    Reviewing {
        store: DraftStore,
        warnings: Vec<ExtractWarning>,
    },
    Committing,
    Committed {
        recipe_id: u64,
    },
    Failed {
        stage: Stage,
        message: String,
    },
}

impl SessionState {
    fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Fetching => "fetching",
            SessionState::Extracting => "extracting",
            SessionState::Reviewing { .. } => "reviewing",
            SessionState::Committing => "committing",
            SessionState::Committed { .. } => "committed",
            SessionState::Failed { .. } => "failed",
        }
    }
}

/// One scan-review-commit flow. Sessions are independent values; run as
/// many concurrently as you like, they share nothing mutable. Within a
/// session the `&mut self` methods enforce the single-writer rule at
/// compile time.
///
/// Cancelling a fetch or extraction is cooperative: drop the future
/// returned by [`scan`](Self::scan), then call [`cancel`](Self::cancel)
/// to return the session to idle. Once [`commit`](Self::commit) has
/// started, cancellation is not honored — abandoning half-written
/// records is worse than letting the write finish and report.
pub struct ScanSession<S> {
    fetcher: SourceFetcher,
    extractor: Extractor,
    coordinator: CommitCoordinator<S>,
    state: SessionState,
}

impl<S: RecipeStore> ScanSession<S> {
    pub fn new(fetcher: SourceFetcher, extractor: Extractor, store: S) -> Self {
        ScanSession {
            fetcher,
            extractor,
            coordinator: CommitCoordinator::new(store),
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The editable draft, while the session is reviewing
    pub fn draft_store(&self) -> Option<&DraftStore> {
        match &self.state {
            SessionState::Reviewing { store, .. } => Some(store),
            _ => None,
        }
    }

    pub fn draft_store_mut(&mut self) -> Option<&mut DraftStore> {
        match &mut self.state {
            SessionState::Reviewing { store, .. } => Some(store),
            _ => None,
        }
    }

    /// Sections the extractor could not find, for the review UI to flag
    pub fn warnings(&self) -> &[ExtractWarning] {
        match &self.state {
            SessionState::Reviewing { warnings, .. } => warnings,
            _ => &[],
        }
    }

    /// Run fetch and extraction, ending in `Reviewing` on success or
    /// `Failed` with the stage that broke. Starting a scan discards any
    /// draft left over from an earlier run of this session.
    pub async fn scan(&mut self, request: ScanRequest) -> Result<(), ScanError> {
        if matches!(self.state, SessionState::Reviewing { .. }) {
            debug!("Starting a new scan discards the draft under review");
        }

        self.state = SessionState::Fetching;
        let content = match self.fetcher.fetch(request).await {
            Ok(content) => content,
            Err(err) => return Err(self.fail(Stage::Fetching, err.into())),
        };

        self.state = SessionState::Extracting;
        let (raw, warnings) = match self.extractor.extract(content).await {
            Ok(result) => result,
            Err(err) => return Err(self.fail(Stage::Extracting, err.into())),
        };

        for warning in &warnings {
            warn!("Extraction gap: {}", warning);
        }

        self.state = SessionState::Reviewing {
            store: DraftStore::load(raw),
            warnings,
        };
        Ok(())
    }

    /// Persist a snapshot of the reviewed draft. The snapshot means edits
    /// racing the commit cannot corrupt the write; they are simply not
    /// part of it.
    pub async fn commit(&mut self) -> Result<u64, ScanError> {
        let snapshot = match &self.state {
            SessionState::Reviewing { store, .. } => store.snapshot(),
            other => {
                return Err(ScanError::Commit(CommitError::Invalid(format!(
                    "no draft is under review (session is {})",
                    other.name()
                ))))
            }
        };

        self.state = SessionState::Committing;
        match self.coordinator.commit(&snapshot).await {
            Ok(recipe_id) => {
                self.state = SessionState::Committed { recipe_id };
                Ok(recipe_id)
            }
            Err(err) => Err(self.fail(Stage::Committing, err.into())),
        }
    }

    /// Discard the draft and return to idle. Honored while reviewing, or
    /// while fetching/extracting after the caller dropped the scan future.
    /// Not honored once committing has begun.
    pub fn cancel(&mut self) -> bool {
        match self.state {
            SessionState::Fetching
            | SessionState::Extracting
            | SessionState::Reviewing { .. } => {
                self.state = SessionState::Idle;
                true
            }
            _ => false,
        }
    }

    fn fail(&mut self, stage: Stage, err: ScanError) -> ScanError {
        self.state = SessionState::Failed {
            stage,
            message: err.to_string(),
        };
        err
    }
}
