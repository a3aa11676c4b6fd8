use agency_core::{ArtistId, TicketId};
use agency_store::LogOrder;
use agency_tickets::{
    NewComment, Priority, TicketDraft, TicketFilter, TicketPatch, TicketStatus,
};
use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use serde_json::{Value, json};

use super::to_json;
use crate::app::App;

#[derive(Subcommand, Debug)]
pub enum TicketCommand {
    /// Open a ticket. Only the title is required.
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long = "type")]
        ticket_type: Option<String>,
        #[arg(long)]
        priority: Option<Priority>,
        /// Initial status; defaults to `pending`.
        #[arg(long)]
        status: Option<TicketStatus>,
        #[arg(long)]
        artist: Option<ArtistId>,
        /// Assignee nickname.
        #[arg(long)]
        assign: Option<String>,
        /// `YYYY-MM-DD`.
        #[arg(long)]
        due: Option<NaiveDate>,
        #[arg(long)]
        attachment: Option<String>,
    },
    /// Show one ticket.
    Show { id: TicketId },
    /// Edit ticket fields. An empty string clears an optional field.
    Update {
        id: TicketId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long = "type")]
        ticket_type: Option<String>,
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long)]
        due: Option<NaiveDate>,
        /// Remove the due date.
        #[arg(long, conflicts_with = "due")]
        clear_due: bool,
        #[arg(long)]
        attachment: Option<String>,
    },
    /// Move a ticket to another status.
    Status { id: TicketId, status: String },
    /// Assign a ticket; omit the nickname to unassign.
    Assign { id: TicketId, assignee: Option<String> },
    /// Comment on a ticket.
    Comment {
        id: TicketId,
        content: String,
        #[arg(long)]
        attachment: Option<String>,
    },
    /// A ticket's comments, newest first.
    Comments { id: TicketId },
    /// A ticket's audit trail.
    Logs {
        id: TicketId,
        /// `newest` or `oldest`.
        #[arg(long, default_value = "newest")]
        order: LogOrder,
    },
    /// Tickets visible to the caller.
    List(ListArgs),
    /// Counts over all tickets.
    Stats,
    /// Counts over tickets assigned to the caller.
    MyStats,
    /// The number the next ticket created today would get.
    NextNo,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(long)]
    artist: Option<ArtistId>,
    #[arg(long = "type")]
    ticket_type: Option<String>,
    #[arg(long)]
    status: Option<TicketStatus>,
    #[arg(long)]
    priority: Option<Priority>,
    #[arg(long)]
    assigned_to: Option<String>,
    /// Created on or after, `YYYY-MM-DD`.
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Created on or before, `YYYY-MM-DD`.
    #[arg(long)]
    to: Option<NaiveDate>,
    #[arg(long)]
    limit: Option<u32>,
}

impl From<&ListArgs> for TicketFilter {
    fn from(args: &ListArgs) -> Self {
        Self {
            artist_id: args.artist,
            ticket_type: args.ticket_type.clone(),
            status: args.status,
            priority: args.priority,
            assigned_to: args.assigned_to.clone(),
            created_from: args.from,
            created_to: args.to,
            limit: args.limit,
        }
    }
}

impl TicketCommand {
    pub fn run(&self, app: &App) -> Result<Value> {
        let svc = app.tickets()?;
        let caller = &app.caller;
        match self {
            Self::Create {
                title,
                description,
                ticket_type,
                priority,
                status,
                artist,
                assign,
                due,
                attachment,
            } => {
                let draft = TicketDraft {
                    artist_id: *artist,
                    title: title.clone(),
                    description: description.clone(),
                    ticket_type: ticket_type.clone(),
                    priority: *priority,
                    status: *status,
                    assigned_to: assign.clone(),
                    due_date: *due,
                    attachment_path: attachment.clone(),
                };
                to_json(&svc.create_ticket(caller, draft)?)
            }
            Self::Show { id } => to_json(&svc.get_ticket(caller, *id)?),
            Self::Update {
                id,
                title,
                description,
                ticket_type,
                priority,
                due,
                clear_due,
                attachment,
            } => {
                let patch = TicketPatch {
                    title: title.clone(),
                    description: description.clone(),
                    ticket_type: ticket_type.clone(),
                    priority: *priority,
                    due_date: if *clear_due { Some(None) } else { due.map(Some) },
                    attachment_path: attachment.clone(),
                };
                to_json(&svc.update_ticket(caller, *id, patch)?)
            }
            Self::Status { id, status } => to_json(&svc.change_status(caller, *id, status)?),
            Self::Assign { id, assignee } => {
                to_json(&svc.assign(caller, *id, assignee.as_deref())?)
            }
            Self::Comment {
                id,
                content,
                attachment,
            } => {
                let comment = NewComment {
                    content: content.clone(),
                    attachment_path: attachment.clone(),
                };
                to_json(&svc.add_comment(caller, *id, &comment)?)
            }
            Self::Comments { id } => to_json(&svc.list_comments(caller, *id)?),
            Self::Logs { id, order } => to_json(&svc.list_logs(caller, *id, *order)?),
            Self::List(args) => to_json(&svc.list_tickets(caller, &TicketFilter::from(args))?),
            Self::Stats => to_json(&svc.ticket_stats()?),
            Self::MyStats => to_json(&svc.my_ticket_stats(caller)?),
            Self::NextNo => Ok(json!({ "ticket_no": svc.next_ticket_no()? })),
        }
    }
}
