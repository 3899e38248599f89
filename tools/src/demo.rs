//! A tiny demo world for sim-runner: a few trains on a straight line, a
//! town that grows with the economy, and a company ledger that reports
//! at month, quarter and year ends.

use railtick_core::{
    error::TickResult,
    scheduler::TickScheduler,
    subsystem::{CalendarEvent, SimSubsystem, SubsystemSlot, TickContext},
    types::{EntityId, EntityPosition, Position},
};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Train {
    pub id:       EntityId,
    pub position: Position,
    /// Units per tick along x.
    pub speed:    i32,
}

pub struct TrainFleet {
    pub trains: Vec<Train>,
    pub distance_travelled: u64,
}

impl TrainFleet {
    pub fn new(count: u32) -> Self {
        let trains = (1..=count)
            .map(|id| Train {
                id,
                position: Position::new(0, id as i32 * 32, 0),
                speed: 4,
            })
            .collect();
        Self { trains, distance_travelled: 0 }
    }
}

impl SimSubsystem for TrainFleet {
    fn name(&self) -> &'static str { "vehicles" }

    fn update(&mut self, ctx: &mut TickContext<'_>) -> TickResult {
        for train in &mut self.trains {
            // Occasional speed changes, drawn from this tick's stream.
            if ctx.rng.chance(0.01) {
                train.speed = 2 + ctx.rng.next_u64_below(6) as i32;
            }
            train.position.x = (train.position.x + train.speed) % 4096;
            self.distance_travelled += train.speed as u64;
        }
        Ok(())
    }

    fn entity_positions(&self, out: &mut Vec<EntityPosition>) {
        out.extend(self.trains.iter().map(|t| EntityPosition { id: t.id, position: t.position }));
    }

    fn as_any(&self) -> &dyn std::any::Any { self }
}

#[derive(Default)]
pub struct Town {
    pub population: u32,
}

impl SimSubsystem for Town {
    fn name(&self) -> &'static str { "towns" }

    fn update(&mut self, _ctx: &mut TickContext<'_>) -> TickResult {
        Ok(())
    }

    fn on_calendar(&mut self, event: CalendarEvent, ctx: &mut TickContext<'_>) -> TickResult {
        if event == CalendarEvent::EconomyMonth {
            self.population += 10 + ctx.rng.next_u64_below(40) as u32;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any { self }
}

#[derive(Default)]
pub struct CompanyLedger {
    pub months:   u32,
    pub quarters: u32,
    pub years:    u32,
}

impl SimSubsystem for CompanyLedger {
    fn name(&self) -> &'static str { "companies" }

    fn update(&mut self, _ctx: &mut TickContext<'_>) -> TickResult {
        Ok(())
    }

    fn on_calendar(&mut self, event: CalendarEvent, ctx: &mut TickContext<'_>) -> TickResult {
        match event {
            CalendarEvent::Month => self.months += 1,
            CalendarEvent::Quarter => {
                self.quarters += 1;
                log::info!("Quarter closed: {} {}", ctx.date.month_name(), ctx.date.year);
            }
            CalendarEvent::Year => {
                self.years += 1;
                log::info!("Year closed: {}", ctx.date.year - 1);
            }
            _ => {}
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any { self }
}

/// Register the demo world.
pub fn install(scheduler: &mut TickScheduler, trains: u32) {
    scheduler.register(SubsystemSlot::Town, Box::new(Town::default()));
    scheduler.register(SubsystemSlot::Vehicle, Box::new(TrainFleet::new(trains)));
    scheduler.register(SubsystemSlot::Company, Box::new(CompanyLedger::default()));
}

#[derive(Debug, Serialize)]
pub struct DemoState {
    pub population:         u32,
    pub distance_travelled: u64,
    pub months:             u32,
    pub quarters:           u32,
    pub years:              u32,
    pub trains:             Vec<Train>,
}

pub fn state(scheduler: &TickScheduler) -> DemoState {
    let town = scheduler.subsystem::<Town>();
    let fleet = scheduler.subsystem::<TrainFleet>();
    let company = scheduler.subsystem::<CompanyLedger>();
    DemoState {
        population:         town.map_or(0, |t| t.population),
        distance_travelled: fleet.map_or(0, |f| f.distance_travelled),
        months:             company.map_or(0, |c| c.months),
        quarters:           company.map_or(0, |c| c.quarters),
        years:              company.map_or(0, |c| c.years),
        trains:             fleet.map(|f| f.trains.clone()).unwrap_or_default(),
    }
}
