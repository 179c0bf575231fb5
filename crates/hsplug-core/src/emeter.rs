//! Energy meter commands (HS110 only).

use tracing::debug;

use crate::{
    commands::{self, Command},
    error::Result,
    response::{self, DailyStats, EnergyReading, MonthlyStats},
    transport::Transport,
};

/// The energy meter of one plug, borrowed from its handle.
///
/// Obtained from [`Hs110::meter`](crate::device::Hs110::meter).
pub struct Meter<'a> {
    transport: &'a dyn Transport,
}

impl<'a> Meter<'a> {
    pub(crate) fn new(transport: &'a dyn Transport) -> Self {
        Self { transport }
    }

    async fn query(&self, command: &Command) -> Result<String> {
        debug!(host = self.transport.host(), "emeter query");
        self.transport.send(command).await
    }

    /// Current voltage, current, power and lifetime energy.
    pub async fn realtime(&self) -> Result<EnergyReading> {
        let raw = self.query(&commands::ENERGY).await?;
        response::extract(&raw, "emeter", "get_realtime")
    }

    /// Per-day energy for `month` (1-12) of `year`.
    pub async fn daily_stats(&self, month: u32, year: i32) -> Result<DailyStats> {
        let raw = self.query(&commands::daily_stats(month, year)).await?;
        response::extract(&raw, "emeter", "get_daystat")
    }

    /// Per-month energy for `year`.
    pub async fn monthly_stats(&self, year: i32) -> Result<MonthlyStats> {
        let raw = self.query(&commands::monthly_stats(year)).await?;
        response::extract(&raw, "emeter", "get_monthstat")
    }

    /// Erases all stored statistics.
    pub async fn erase_stats(&self) -> Result<()> {
        let raw = self.query(&commands::ENERGY_RESET).await?;
        response::expect_ack(&raw, "emeter", "erase_emeter_stat")
    }
}
