pub mod event;
pub mod ticket;
pub mod traffic;
pub mod user;

pub use event::{Event, EventSearch, EventUpdate, EventWithCreator, Location, NewEvent};
pub use ticket::{IssueTicketRequest, NewTicket, Ticket, TicketDetails, TicketFilter};
pub use traffic::DailyTraffic;
pub use user::{NewUser, User, UserRole, UserUpdate};
