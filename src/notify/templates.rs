//! Email subjects and HTML bodies. All user-supplied text is escaped.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub subject: String,
    pub html: String,
}

fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
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

fn layout(heading: &str, body: &str) -> String {
    format!(
        "<div style=\"font-family:sans-serif;max-width:560px;margin:auto\">\
         <h2>{heading}</h2>{body}\
         <p style=\"color:#888;font-size:12px\">\
         You are receiving this because of activity on your Gigboard account.</p>\
         </div>"
    )
}

/// Sent to the poster when someone pings their gig.
pub fn new_ping(poster_name: &str, applicant_name: &str, gig_title: &str, message: &str) -> Email {
    let gig_title = escape(gig_title);
    let body = format!(
        "<p>Hi {},</p><p><strong>{}</strong> pinged your gig <strong>{}</strong>:</p>\
         <blockquote>{}</blockquote>",
        escape(poster_name),
        escape(applicant_name),
        gig_title,
        escape(message),
    );
    Email {
        subject: format!("New ping on \"{gig_title}\""),
        html: layout("You have a new applicant", &body),
    }
}

/// Sent to the applicant whose ping was accepted.
pub fn ping_accepted(applicant_name: &str, poster_name: &str, gig_title: &str) -> Email {
    let gig_title = escape(gig_title);
    let body = format!(
        "<p>Hi {},</p><p><strong>{}</strong> accepted your ping on <strong>{}</strong>. \
         Reach out to them to get started.</p>",
        escape(applicant_name),
        escape(poster_name),
        gig_title,
    );
    Email {
        subject: format!("You got the gig: \"{gig_title}\""),
        html: layout("Your ping was accepted", &body),
    }
}

/// Sent to the applicant when the poster declines their ping.
pub fn ping_rejected(applicant_name: &str, gig_title: &str) -> Email {
    let gig_title = escape(gig_title);
    let body = format!(
        "<p>Hi {},</p><p>Your ping on <strong>{}</strong> was not selected this time. \
         Plenty of other gigs are waiting for you.</p>",
        escape(applicant_name),
        gig_title,
    );
    Email {
        subject: format!("Update on \"{gig_title}\""),
        html: layout("Your ping was declined", &body),
    }
}
