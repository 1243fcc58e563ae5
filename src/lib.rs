pub mod binder;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod enqueue_job;
pub mod error;
pub mod http_job;
pub mod job;
pub mod mock_job;
pub mod monitor;
pub mod params;
pub mod queue;
pub mod registry;
pub mod report;
pub mod report_job;
pub mod result;
pub mod runner;
pub mod shell_job;
pub mod storage;

pub use binder::{BindingError, Bindings, FromParam};
pub use config::{ConfigError, ServiceConfig};
pub use context::{Invocation, InvocationContext, InvocationId, JobRequest};
pub use diagnostics::{Diagnostics, TraceSource, TracingDiagnostics};
pub use enqueue_job::{EnqueueError, EnqueueJob};
pub use error::InvokerError;
pub use http_job::{HttpError, HttpJob};
pub use job::{Job, JobError};
pub use mock_job::{MockFailure, MockJob};
pub use monitor::{MemoryMonitor, Monitor, MonitorEvent, Stage};
pub use params::{InvalidPair, Parameters};
pub use queue::{JobQueue, MemoryQueue, QueueError};
pub use registry::JobRegistry;
pub use report::{JsonReportParser, ReportError, ReportLoader, ReportParser};
pub use report_job::{ReportJob, ReportJobError};
pub use result::{Fault, JobResult, JobStatus};
pub use runner::{invoke, Invoker};
pub use shell_job::{ShellError, ShellJob};
pub use storage::{ContentStream, FileStorage, LocalFileStorage, MemoryFileStorage, StorageError};
