//! # Vidwatch Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore custom per le diverse operazioni
//! - `codec`: Builder puro degli argomenti ffmpeg
//! - `engine`: Conversion engine (singolo pass e split mode)
//! - `split`: Segmentazione, ordinamento dei chunk e merge
//! - `discovery`: Espansione pattern e filtro keyword (batch mode)
//! - `dedup`: ProcessingSet contro le conversioni duplicate
//! - `scheduler`: Worker pool a concorrenza limitata
//! - `watcher`: Monitoraggio filesystem e dispatch dei candidati
//! - `events`: Event bus di lifecycle per osservatori esterni
//! - `record`: ResultRecord persistito una riga JSON per job
//! - `batch`: Orchestratore del batch mode
//! - `notifier`: Notifiche desktop best-effort
//! - `platform`: Comandi esterni cross-platform e cestino
//!
//! ## Flusso watch mode:
//! Watcher → Dedup Gate → Scheduler → Conversion Engine → Event Bus
//!
//! ## Flusso batch mode:
//! Discovery & Filter → Scheduler → Conversion Engine

pub mod batch;
pub mod codec;
pub mod config;
pub mod dedup;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod events;
pub mod notifier;
pub mod platform;
pub mod record;
pub mod scheduler;
pub mod split;
pub mod watcher;

pub use batch::{BatchProcessor, BatchStats};
pub use config::Config;
pub use dedup::ProcessingSet;
pub use engine::Converter;
pub use error::ConvertError;
pub use events::{EventBus, LifecycleEvent};
pub use record::ResultRecord;
pub use scheduler::WorkerPool;
pub use watcher::DirectoryWatcher;
