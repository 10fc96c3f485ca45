//! The fault-tolerance context: registry, gate, reporter and dispatcher.

use core::cell::Cell;
use core::time::Duration;

use critical_section::Mutex;

use crate::config::{FtConfig, MAX_PRE_REBOOT_HOOKS};
use crate::dispatcher::{DispatchState, DispatcherState, RebootCause};
use crate::gate::DetectionGate;
use crate::handler::{FaultHandler, HandlerRef, PreRebootHook, RawFaultHandler, Verdict};
use crate::history::{FaultHistory, FaultRecord};
use crate::nesting::NestingTracker;
use crate::platform::{LogRecord, Platform, Stage};
use crate::registry::{HandlerRegistry, Registration};
use crate::stats::FaultStats;
use crate::{Disposition, FaultEvent, FaultKind, FtError, FtResult, KindSet, RecoveryResult};

type Hooks<'h> = [Option<&'h dyn PreRebootHook>; MAX_PRE_REBOOT_HOOKS];

/// One fault-tolerance instance.
///
/// Every method takes `&self`, and construction is `const`, so an instance
/// can live in a `static` and be shared by threads and interrupt handlers.
/// Tests create independent instances on the stack.
///
/// # RT Safety
///
/// [`report_fault`](Self::report_fault) never allocates and never blocks. It
/// reads the gate with one atomic load and copies the handler out of the
/// registry in a short critical section; the handler itself runs with no
/// lock held.
///
/// # Example
///
/// ```rust
/// use core::time::Duration;
/// use rtos_ft::prelude::*;
///
/// fn drop_packet(_: &FaultEvent<'_>) -> RecoveryResult {
///     RecoveryResult::Recovered
/// }
///
/// let ft = FaultTolerance::new(FtConfig::DEFAULT, Platform::host());
/// ft.init()?;
/// ft.register_handler(FaultKind::CommCrcError, &drop_packet)?;
///
/// let event = FaultEvent::new(FaultKind::CommCrcError, ft.now());
/// assert_eq!(ft.report_fault(&event), Disposition::Gated);
///
/// ft.enable_detection(FaultKind::CommCrcError);
/// assert_eq!(ft.report_fault(&event), Disposition::Recovered);
/// assert_eq!(ft.state(), DispatchState::Normal);
/// # Ok::<(), FtError>(())
/// ```
pub struct FaultTolerance<'h> {
    config: FtConfig,
    platform: Platform<'h>,
    registry: HandlerRegistry<'h>,
    gate: DetectionGate,
    dispatcher: DispatcherState,
    nesting: NestingTracker,
    stats: FaultStats,
    history: FaultHistory,
    hooks: Mutex<Cell<Hooks<'h>>>,
}

impl<'h> FaultTolerance<'h> {
    /// New instance. Detection starts as `config.initially_enabled`.
    #[must_use]
    pub const fn new(config: FtConfig, platform: Platform<'h>) -> Self {
        Self {
            config,
            platform,
            registry: HandlerRegistry::new(),
            gate: DetectionGate::with_enabled(config.initially_enabled),
            dispatcher: DispatcherState::new(),
            nesting: NestingTracker::new(),
            stats: FaultStats::new(),
            history: FaultHistory::new(),
            hooks: Mutex::new(Cell::new([None; MAX_PRE_REBOOT_HOOKS])),
        }
    }

    /// Reset registry, gate, dispatcher, hooks, statistics and history to
    /// their boot state.
    ///
    /// # Errors
    ///
    /// Returns [`FtError::InvalidConfiguration`] if the configuration is
    /// invalid; nothing is reset in that case.
    pub fn init(&self) -> FtResult<()> {
        self.config.validate()?;
        self.registry.clear();
        self.gate.set(self.config.initially_enabled);
        self.dispatcher.reset();
        self.nesting.reset();
        self.stats.reset();
        self.history.clear();
        critical_section::with(|cs| self.hooks.borrow(cs).set([None; MAX_PRE_REBOOT_HOOKS]));
        tracing::info!(
            max_nesting_depth = self.config.max_nesting_depth,
            duplicate_policy = ?self.config.duplicate_policy,
            enabled = self.config.initially_enabled.len(),
            "Fault tolerance initialized"
        );
        Ok(())
    }

    /// Install the recovery handler for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`FtError::AlreadyRegistered`] if duplicates are rejected by
    /// the configuration and `kind` already has a handler.
    pub fn register_handler(&self, kind: FaultKind, handler: &'h dyn FaultHandler) -> FtResult<()> {
        let outcome = self
            .registry
            .register(kind, handler, self.config.duplicate_policy);
        self.log_registration(kind, outcome)
    }

    /// Install a handler that answers with a raw verdict word.
    ///
    /// # Errors
    ///
    /// Same as [`register_handler`](Self::register_handler).
    pub fn register_raw_handler(
        &self,
        kind: FaultKind,
        handler: &'h dyn RawFaultHandler,
    ) -> FtResult<()> {
        let outcome = self
            .registry
            .register_raw(kind, handler, self.config.duplicate_policy);
        self.log_registration(kind, outcome)
    }

    fn log_registration(&self, kind: FaultKind, outcome: FtResult<Registration>) -> FtResult<()> {
        match outcome {
            Ok(Registration::Installed) => {
                tracing::debug!(kind = kind.as_str(), "Fault handler registered");
                Ok(())
            }
            Ok(Registration::Replaced) => {
                tracing::warn!(kind = kind.as_str(), "Fault handler replaced");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(kind = kind.as_str(), error = %e, "Fault handler rejected");
                Err(e)
            }
        }
    }

    /// Remove the handler for `kind`. Returns true if one was installed.
    pub fn unregister_handler(&self, kind: FaultKind) -> bool {
        let removed = self.registry.unregister(kind);
        if removed {
            tracing::debug!(kind = kind.as_str(), "Fault handler removed");
        }
        removed
    }

    /// True if `kind` has a handler.
    #[must_use]
    pub fn has_handler(&self, kind: FaultKind) -> bool {
        self.registry.contains(kind)
    }

    /// Start dispatching reports of `kind`. Returns true if it was disabled.
    pub fn enable_detection(&self, kind: FaultKind) -> bool {
        let changed = self.gate.enable(kind);
        if changed {
            tracing::debug!(kind = kind.as_str(), "Fault detection enabled");
        }
        changed
    }

    /// Stop dispatching reports of `kind`. Returns true if it was enabled.
    pub fn disable_detection(&self, kind: FaultKind) -> bool {
        let changed = self.gate.disable(kind);
        if changed {
            tracing::debug!(kind = kind.as_str(), "Fault detection disabled");
        }
        changed
    }

    /// True if reports of `kind` are dispatched.
    #[must_use]
    pub fn is_detection_enabled(&self, kind: FaultKind) -> bool {
        self.gate.is_enabled(kind)
    }

    /// Kinds with detection enabled.
    #[must_use]
    pub fn enabled_kinds(&self) -> KindSet {
        self.gate.enabled()
    }

    /// Report one fault and return what became of it.
    ///
    /// Checks run in this order: detection gate, pending reboot, handler
    /// lookup, nesting bound. The handler then runs synchronously in the
    /// caller's context and its verdict is applied.
    ///
    /// The nesting bound counts reports made from inside a handler in the
    /// same execution context, as named by [`Platform::context`]. Parallel
    /// reports from other contexts never add to it.
    pub fn report_fault(&self, event: &FaultEvent<'_>) -> Disposition {
        let kind = event.kind;
        self.stats.inc_reported(kind);

        if !self.gate.is_enabled(kind) {
            return self.finish_undispatched(Stage::Gated, event, Disposition::Gated);
        }
        if self.dispatcher.is_reboot_pending() {
            return self.finish_undispatched(Stage::Suppressed, event, Disposition::Suppressed);
        }
        let Some(handler) = self.registry.lookup(kind) else {
            let disposition = Disposition::Unhandled {
                severity: event.severity,
            };
            return self.finish_undispatched(Stage::Unhandled, event, disposition);
        };

        let context = self.platform.context.current_context();
        let Ok(guard) = self.nesting.enter(context, self.config.max_nesting_depth) else {
            self.stats.inc_nesting_breaches(kind);
            self.emit(LogRecord::new(Stage::NestingLimit, event, self.config.dump_context));
            self.schedule_reboot(event, RebootCause::NestingLimit(kind));
            return self.finish_dispatched(event, None, Disposition::RebootPending);
        };

        let verdict = self.invoke(handler, event);
        drop(guard);

        let disposition = match verdict.resolve() {
            RecoveryResult::RebootRequired => {
                let cause = if let Verdict::Invalid(_) = verdict {
                    self.emit(
                        LogRecord::new(Stage::InvalidVerdict, event, self.config.dump_context)
                            .with_verdict(verdict),
                    );
                    RebootCause::InvalidVerdict(kind)
                } else {
                    RebootCause::HandlerVerdict(kind)
                };
                self.schedule_reboot(event, cause);
                Disposition::RebootPending
            }
            _ if self.dispatcher.is_reboot_pending() => Disposition::RebootPending,
            result => Disposition::from_verdict(result),
        };
        self.finish_dispatched(event, Some(verdict), disposition)
    }

    fn invoke(&self, handler: HandlerRef<'h>, event: &FaultEvent<'_>) -> Verdict {
        self.emit(LogRecord::new(Stage::Dispatch, event, self.config.dump_context));
        self.stats.inc_dispatched(event.kind);
        self.dispatcher.begin_handling();
        let verdict = handler.invoke(event);
        self.dispatcher.end_handling();
        verdict
    }

    fn schedule_reboot(&self, event: &FaultEvent<'_>, cause: RebootCause) {
        if self.dispatcher.request_reboot(cause) {
            self.emit(
                LogRecord::new(Stage::RebootScheduled, event, self.config.dump_context)
                    .with_disposition(Disposition::RebootPending),
            );
        }
    }

    fn finish_undispatched(
        &self,
        stage: Stage,
        event: &FaultEvent<'_>,
        disposition: Disposition,
    ) -> Disposition {
        self.stats.record_disposition(event.kind, disposition);
        self.emit(
            LogRecord::new(stage, event, self.config.dump_context).with_disposition(disposition),
        );
        disposition
    }

    fn finish_dispatched(
        &self,
        event: &FaultEvent<'_>,
        verdict: Option<Verdict>,
        disposition: Disposition,
    ) -> Disposition {
        self.stats.record_disposition(event.kind, disposition);
        if self.config.record_history {
            self.history
                .record(FaultRecord::new(event, disposition, self.platform.clock.now()));
        }
        let mut record = LogRecord::new(Stage::Resolved, event, self.config.dump_context)
            .with_disposition(disposition);
        if let Some(verdict) = verdict {
            record = record.with_verdict(verdict);
        }
        self.emit(record);
        disposition
    }

    #[inline]
    fn emit(&self, record: LogRecord<'_>) {
        self.platform.sink.record(&record);
    }

    /// Current dispatcher state.
    #[must_use]
    pub fn state(&self) -> DispatchState {
        self.dispatcher.state()
    }

    /// True once a reset is mandatory.
    #[must_use]
    pub fn is_reboot_pending(&self) -> bool {
        self.dispatcher.is_reboot_pending()
    }

    /// Why a reset is pending, if one is.
    #[must_use]
    pub fn reboot_cause(&self) -> Option<RebootCause> {
        self.dispatcher.reboot_cause()
    }

    /// True once the reset primitive has been called.
    #[must_use]
    pub fn reset_issued(&self) -> bool {
        self.dispatcher.reset_issued()
    }

    /// Add a hook that runs before the reset primitive.
    ///
    /// # Errors
    ///
    /// Returns [`FtError::HookCapacityExceeded`] if
    /// [`MAX_PRE_REBOOT_HOOKS`] hooks are already registered.
    pub fn register_pre_reboot_hook(&self, hook: &'h dyn PreRebootHook) -> FtResult<()> {
        critical_section::with(|cs| {
            let cell = self.hooks.borrow(cs);
            let mut hooks = cell.get();
            let slot = hooks
                .iter_mut()
                .find(|slot| slot.is_none())
                .ok_or(FtError::HookCapacityExceeded {
                    capacity: MAX_PRE_REBOOT_HOOKS,
                })?;
            *slot = Some(hook);
            cell.set(hooks);
            Ok(())
        })
    }

    /// Perform a pending reset: run every pre-reboot hook, then call the
    /// reset primitive.
    ///
    /// Call from thread level, never from an interrupt handler. Only the
    /// first call after a reboot became pending acts and returns the cause;
    /// every other call returns `None`.
    pub fn service_pending_reboot(&self) -> Option<RebootCause> {
        if !self.dispatcher.claim_reset() {
            return None;
        }
        let cause = self
            .dispatcher
            .reboot_cause()
            .unwrap_or(RebootCause::Inconsistent);
        let hooks = critical_section::with(|cs| self.hooks.borrow(cs).get());
        tracing::error!(
            cause = %cause,
            requests = self.dispatcher.reboot_requests(),
            hooks = hooks.iter().flatten().count(),
            "Servicing pending reboot"
        );
        for hook in hooks.iter().flatten() {
            hook.before_reboot(cause);
        }
        self.platform.reset.reset(cause);
        Some(cause)
    }

    /// Fault counters.
    #[must_use]
    pub fn stats(&self) -> &FaultStats {
        &self.stats
    }

    /// Recently handled faults.
    #[must_use]
    pub fn history(&self) -> &FaultHistory {
        &self.history
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &FtConfig {
        &self.config
    }

    /// Current time from the platform clock.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.platform.clock.now()
    }
}

impl core::fmt::Debug for FaultTolerance<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FaultTolerance")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("handlers", &self.registry.len())
            .field("enabled", &self.gate.enabled())
            .finish_non_exhaustive()
    }
}
