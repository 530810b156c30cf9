//! Keyword intent classification and canned response selection.
//!
//! A static rule table, not a model: deterministic, total over all string
//! inputs, first match wins. The precedence matters because keywords can
//! co-occur ("report the traffic" is a traffic query, not a report).

use crate::bot::message::MessageKind;

/// What the user is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Traffic,
    Route,
    Notifications,
    Location,
    Help,
    Report,
    Fallback,
}

impl Intent {
    /// Classify raw user text. Case-insensitive, priority ordered.
    pub fn of(text: &str) -> Self {
        let input = text.to_lowercase();

        if input.starts_with("/traffic") || input.contains("traffic") {
            Intent::Traffic
        } else if input.starts_with("/route") || input.contains("route") {
            Intent::Route
        } else if input.starts_with("/notifications") || input.contains("notification") {
            Intent::Notifications
        } else if input.starts_with("/location") || input.contains("location") {
            Intent::Location
        } else if input.starts_with("/help") {
            Intent::Help
        } else if input.contains("report") {
            Intent::Report
        } else {
            Intent::Fallback
        }
    }

    /// Semantic tag carried on the reply message.
    pub fn kind(self) -> MessageKind {
        match self {
            Intent::Traffic => MessageKind::Traffic,
            Intent::Route => MessageKind::Route,
            Intent::Notifications => MessageKind::Alert,
            Intent::Location => MessageKind::General,
            Intent::Help => MessageKind::General,
            Intent::Report => MessageKind::Alert,
            Intent::Fallback => MessageKind::General,
        }
    }

    /// The fixed response block for this intent.
    pub fn reply(self) -> &'static str {
        match self {
            Intent::Traffic => TRAFFIC_REPLY,
            Intent::Route => ROUTE_REPLY,
            Intent::Notifications => NOTIFICATIONS_REPLY,
            Intent::Location => LOCATION_REPLY,
            Intent::Help => HELP_REPLY,
            Intent::Report => REPORT_REPLY,
            Intent::Fallback => FALLBACK_REPLY,
        }
    }
}

const TRAFFIC_REPLY: &str = "🚦 Current Traffic Conditions:\n\n\
📍 Highway 101: Heavy congestion (15 min delay)\n\
📍 Main Street: Light traffic\n\
📍 Downtown: Moderate traffic due to construction\n\n\
⚠️ Accident reported on Highway 1 - expect delays\n\n\
Would you like specific route information?";

const ROUTE_REPLY: &str = "🗺️ Route Planning Available!\n\n\
Please specify:\n\
• Starting location\n\
• Destination\n\
• Preferred departure time\n\n\
Example: \"Route from Downtown to Airport at 3 PM\"\n\n\
I'll provide the best route with current traffic conditions! 🚗";

const NOTIFICATIONS_REPLY: &str = "🔔 Notification Settings:\n\n\
✅ Daily commute alerts: ON\n\
✅ Accident notifications: ON\n\
⏰ Morning briefing: 7:00 AM\n\
⏰ Evening update: 5:00 PM\n\n\
Customize your preferences:\n\
• Set commute route\n\
• Choose notification times\n\
• Select alert types\n\n\
Type /settings to modify preferences.";

const LOCATION_REPLY: &str = "📍 Location Services:\n\n\
Current location: San Francisco, CA\n\n\
🏠 Saved locations:\n\
• Home: 123 Main St\n\
• Work: Downtown Office\n\
• Favorite: Shopping Mall\n\n\
To add a new location, type:\n\
\"Add location [name] at [address]\"\n\n\
Example: \"Add location Gym at 456 Oak St\"";

const HELP_REPLY: &str = "📚 Available Commands:\n\n\
/traffic - Get current traffic conditions\n\
/route - Plan your route\n\
/notifications - Manage alerts\n\
/location - Location settings\n\
/report - Report traffic issues\n\
/subscribe - Subscribe to updates\n\n\
💬 Natural Language:\n\
• \"What's traffic like on Highway 1?\"\n\
• \"Best route to airport?\"\n\
• \"Report accident on Main Street\"\n\
• \"Subscribe to morning alerts\"";

const REPORT_REPLY: &str = "📢 Traffic Report Submitted!\n\n\
Thank you for helping the community! Your report has been:\n\
✅ Recorded in our database\n\
✅ Shared with other users\n\
✅ Sent to traffic authorities\n\n\
Community reports help everyone stay informed about:\n\
• Accidents and hazards\n\
• Construction zones\n\
• Road closures\n\
• Heavy traffic areas\n\n\
Keep reporting to help fellow commuters! 🤝";

const FALLBACK_REPLY: &str = "🤖 I understand you're asking about traffic conditions!\n\n\
I can help with:\n\
• Real-time traffic updates\n\
• Route planning and optimization\n\
• Traffic alerts and notifications\n\
• Community reports\n\n\
Try asking:\n\
• \"What's the traffic on [road name]?\"\n\
• \"Best route to [destination]?\"\n\
• \"Set up notifications for my commute\"\n\n\
Or use quick commands like /traffic or /route! 🚗";
