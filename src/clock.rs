//! One-second uptime clock with synchronous fan-out.
use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::{Duration, Ticker};

use crate::config;
use crate::registry::{Registry, TickHandler};
use crate::uptime::Uptime;
use crate::{BleStackError, Error};

/// A periodic timer provided by the platform.
///
/// After a successful [`start_periodic`](TimerSource::start_periodic) the
/// platform is expected to call [`Clock::on_timer_tick`] once per period for
/// the rest of the process lifetime.
pub trait TimerSource {
    /// Error reported when the timer cannot be created or started.
    type Error;

    /// Create a repeating timer with the given period and start it.
    fn start_periodic(&mut self, period: Duration) -> Result<(), Self::Error>;
}

#[derive(Clone, Copy)]
struct State {
    uptime: Uptime,
    dispatching: bool,
}

/// Clock using the build-time subscriber capacity.
pub type DefaultClock<'a, M> = Clock<'a, M, { config::MAX_SUBSCRIBERS }>;

/// Counts seconds and hands every tick to its subscribers.
///
/// Subscribers are wired with `&mut self` at boot; ticking only needs
/// `&self`, so the clock can be shared with the timer context afterwards.
pub struct Clock<'a, M: RawMutex, const N: usize> {
    state: Mutex<M, Cell<State>>,
    registry: Registry<'a, N>,
    period: Duration,
}

impl<'a, M: RawMutex, const N: usize> Clock<'a, M, N> {
    /// Create a clock with the configured period and no subscribers.
    pub const fn new() -> Self {
        Self::with_period(Duration::from_millis(config::TICK_PERIOD_MS))
    }

    /// Create a clock with a custom period.
    pub const fn with_period(period: Duration) -> Self {
        Self {
            state: Mutex::new(Cell::new(State {
                uptime: Uptime::ZERO,
                dispatching: false,
            })),
            registry: Registry::new(),
            period,
        }
    }

    /// Subscribe a handler to every future tick.
    ///
    /// Fails with [`Error::RegistryFull`] once `N` handlers are registered.
    pub fn subscribe(&mut self, handler: &'a dyn TickHandler) -> Result<usize, Error> {
        match self.registry.register(handler) {
            Ok(slot) => {
                debug!("[clock] subscriber registered in slot {}", slot);
                Ok(slot)
            }
            Err(e) => {
                error!("[clock] cannot register subscriber, all {} slots taken", N);
                Err(e)
            }
        }
    }

    /// Arm the platform timer at this clock's period.
    pub fn init<T: TimerSource>(&self, timer: &mut T) -> Result<(), BleStackError<T::Error>> {
        timer.start_periodic(self.period).map_err(BleStackError::Stack)?;
        info!(
            "[clock] timer armed, period {} ms, {} subscribers",
            self.period.as_millis(),
            self.registry.len()
        );
        Ok(())
    }

    /// Advance the uptime by one second and notify every subscriber.
    ///
    /// This is the only place the uptime changes. All subscribers see the
    /// same value, in registration order. A tick raised from inside a
    /// subscriber is rejected with [`Error::Reentrant`] and does not count.
    pub fn on_timer_tick(&self) -> Result<Uptime, Error> {
        let uptime = self.state.lock(|state| {
            let mut s = state.get();
            if s.dispatching {
                return None;
            }
            s.uptime = s.uptime.next();
            s.dispatching = true;
            state.set(s);
            Some(s.uptime)
        });

        let Some(uptime) = uptime else {
            warn!("[clock] tick raised during dispatch, ignored");
            return Err(Error::Reentrant);
        };

        trace!("[clock] tick {}", uptime.as_secs());
        self.registry.dispatch(uptime);

        self.state.lock(|state| {
            let mut s = state.get();
            s.dispatching = false;
            state.set(s);
        });
        Ok(uptime)
    }

    /// Drive the clock from an embassy ticker. Never returns.
    pub async fn run(&self) -> ! {
        let mut ticker = Ticker::every(self.period);
        info!("[clock] running, period {} ms", self.period.as_millis());
        loop {
            ticker.next().await;
            let _ = self.on_timer_tick();
        }
    }

    /// Uptime at the last tick.
    pub fn uptime(&self) -> Uptime {
        self.state.lock(|state| state.get().uptime)
    }

    /// Timer period.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Number of subscribers.
    pub fn subscribers(&self) -> usize {
        self.registry.len()
    }
}

impl<'a, M: RawMutex, const N: usize> Default for Clock<'a, M, N> {
    fn default() -> Self {
        Self::new()
    }
}
