//! `fixtrack-workshop` — repair tickets and the devices they track.

pub mod device;
pub mod ticket;

pub use device::{Device, DeviceStatus, DeviceUpdate, NewDevice};
pub use ticket::{NewTicket, Ticket, TicketPriority, TicketStatus, TicketUpdate};
