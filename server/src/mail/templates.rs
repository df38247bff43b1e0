//! HTML bodies for transactional mail. Every interpolated value is escaped.

use crate::mail::Email;
use crate::models::{Event, Ticket, User, UserRole};

const CONFIRM_COLOUR: &str = "#007bff";
const ALERT_COLOUR: &str = "#f54278";

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, colour: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="UTF-8">
  <title>{title}</title>
</head>
<body style="font-family: Arial, sans-serif; background-color: #f5f5f5; margin: 0; padding: 20px;">
  <table style="max-width: 600px; margin: 20px auto; padding: 20px; background-color: #fff; border-radius: 10px;">
    <tr>
      <td style="background-color: {colour}; color: #fff; text-align: center; padding: 20px;">
        <h1>{title}</h1>
      </td>
    </tr>
    <tr>
      <td style="padding: 20px;">
{body}
      </td>
    </tr>
    <tr>
      <td style="text-align: center; padding-top: 20px; border-top: 1px solid #ddd; color: #777; font-size: 12px;">
        <p>Discover upcoming events in your town.</p>
      </td>
    </tr>
  </table>
</body>
</html>"#
    )
}

fn ticket_block(ticket: &Ticket, event: &Event) -> String {
    let location = &event.location;
    let image = ticket
        .qr_image
        .as_deref()
        .map(|src| {
            format!(
                r#"<img src="{}" alt="Ticket QR code" width="200" height="200" style="display: block; margin: 20px auto;">"#,
                escape(src)
            )
        })
        .unwrap_or_default();
    format!(
        r#"        <h4>Event Name: {title}</h4>
        <h4>No. of Tickets: {quantity}</h4>
        <h4>Venue: {address}, {city}, {pincode}</h4>
        <h4>Time: {time} GMT</h4>
        <div style="margin-top: 20px; border-top: 1px solid #ddd; padding-top: 20px;">
          <p><strong>Ticket code:</strong> {code}</p>
          {image}
        </div>"#,
        title = escape(&event.title),
        quantity = ticket.number_of_tickets,
        address = escape(&location.address),
        city = escape(&location.city),
        pincode = escape(&location.pincode),
        time = escape(&event.time),
        code = escape(&ticket.ticket_code),
    )
}

pub fn receipt(to: &str, name: &str, ticket: &Ticket, event: &Event) -> Email {
    let body = format!(
        "        <p>Dear {},</p>\n        <p>We are excited to have you attend our event. Here are your receipt and ticket details:</p>\n{}",
        escape(name),
        ticket_block(ticket, event)
    );
    Email {
        to: to.to_string(),
        subject: "Ticket Details".to_string(),
        html: layout("Thank you for your purchase!", CONFIRM_COLOUR, &body),
    }
}

pub fn event_reminder(holder: &User, ticket: &Ticket, event: &Event) -> Email {
    let body = format!(
        "        <p>Hi {},</p>\n        <p>We are excited to have you attend our event tomorrow. Enjoy the event!</p>\n{}",
        escape(&holder.display_name),
        ticket_block(ticket, event)
    );
    Email {
        to: holder.email.clone(),
        subject: format!("Reminder: Event - {}", event.title),
        html: layout("Event Reminder", CONFIRM_COLOUR, &body),
    }
}

pub fn ticket_cancelled(holder: &User, event: &Event) -> Email {
    let body = format!(
        r#"        <p>Dear {name},</p>
        <p>We regret to inform you that the event <strong>{title}</strong> has been deleted.</p>
        <p>Your ticket for this event has been canceled. A support team member will follow up within 72 working hours to process your refund.</p>"#,
        name = escape(&holder.display_name),
        title = escape(&event.title),
    );
    Email {
        to: holder.email.clone(),
        subject: "Your ticket has been canceled due to event cancelation".to_string(),
        html: layout("Ticket Cancelled", ALERT_COLOUR, &body),
    }
}

pub fn event_removed_by_admin(organizer: &User, event: &Event) -> Email {
    let body = format!(
        r#"        <p>Dear {name},</p>
        <p>We regret to inform you that the event <strong>{title}</strong> you created has been deleted by our system administrator due to policy violations.</p>
        <p>Please feel free to contact our support team if you have any questions or concerns.</p>"#,
        name = escape(&organizer.display_name),
        title = escape(&event.title),
    );
    Email {
        to: organizer.email.clone(),
        subject: "Your Event has been deleted".to_string(),
        html: layout("Event Deleted", ALERT_COLOUR, &body),
    }
}

pub fn account_deleted(user: &User) -> Email {
    let detail = match user.role {
        UserRole::Organizer => "your account and the events you created with us have been deleted",
        _ => "your account and the tickets you purchased with us have been deleted and canceled",
    };
    let refund = match user.role {
        UserRole::Organizer => "",
        _ => "\n        <p>A support team member will follow up within 72 working hours to process your refund if any.</p>",
    };
    let body = format!(
        "        <p>Dear {},</p>\n        <p>We regret to inform you that {detail} by our system administrator due to policy violations.</p>{refund}\n        <p>Please feel free to contact our support team if you have any questions or concerns.</p>",
        escape(&user.display_name),
    );
    Email {
        to: user.email.clone(),
        subject: "Your Event-Finder account has been deleted".to_string(),
        html: layout("Account Deleted", ALERT_COLOUR, &body),
    }
}
