use bastion_construction::ConstructionEvent;
use bastion_core::fixed::Ticks;
use bastion_core::id::DepositId;
use bastion_pipeline::TransportEvent;
use bastion_power::PowerEvent;

/// Everything observable that happened during a tick or a command.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    Construction(ConstructionEvent),
    Power(PowerEvent),
    Transport(TransportEvent),
    /// A finite deposit was drawn down to zero.
    DepositExhausted { deposit: DepositId, tick: Ticks },
}

impl From<ConstructionEvent> for SimEvent {
    fn from(e: ConstructionEvent) -> Self {
        SimEvent::Construction(e)
    }
}

impl From<PowerEvent> for SimEvent {
    fn from(e: PowerEvent) -> Self {
        SimEvent::Power(e)
    }
}

impl From<TransportEvent> for SimEvent {
    fn from(e: TransportEvent) -> Self {
        SimEvent::Transport(e)
    }
}
