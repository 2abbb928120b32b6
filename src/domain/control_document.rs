//! Carrier control documents (TwiML)
//!
//! A control document tells the carrier what to do with a call leg. The
//! bridge emits three kinds: the inbound media-stream hookup, the caller's
//! conference entry, and the agent leg's briefing plus conference entry.

use std::fmt::Write;

/// Options of a `<Conference>` noun
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConferenceOptions {
    pub start_conference_on_enter: bool,
    pub end_conference_on_exit: bool,
    pub status_callback: String,
    pub record: bool,
    pub recording_status_callback: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Verb {
    Say(String),
    DialConference {
        name: String,
        time_limit: Option<u32>,
        options: ConferenceOptions,
    },
    ConnectStream {
        action: String,
        url: String,
        name: String,
    },
}

/// Voice control document builder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceResponse {
    verbs: Vec<Verb>,
}

impl VoiceResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Speak a message (text is escaped on render)
    pub fn say(mut self, text: impl Into<String>) -> Self {
        self.verbs.push(Verb::Say(text.into()));
        self
    }

    /// Dial into a named conference. `time_limit` caps the leg in seconds.
    pub fn dial_conference(
        mut self,
        name: impl Into<String>,
        time_limit: Option<u32>,
        options: ConferenceOptions,
    ) -> Self {
        self.verbs.push(Verb::DialConference {
            name: name.into(),
            time_limit,
            options,
        });
        self
    }

    /// Bridge the call audio to a media stream
    pub fn connect_stream(
        mut self,
        action: impl Into<String>,
        url: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        self.verbs.push(Verb::ConnectStream {
            action: action.into(),
            url: url.into(),
            name: name.into(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.verbs.is_empty()
    }

    /// Render the document
    pub fn to_xml(&self) -> String {
        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><Response>"#);

        for verb in &self.verbs {
            match verb {
                Verb::Say(text) => {
                    let _ = write!(xml, "<Say>{}</Say>", escape_xml(text));
                }
                Verb::DialConference {
                    name,
                    time_limit,
                    options,
                } => {
                    match time_limit {
                        Some(limit) => {
                            let _ = write!(xml, r#"<Dial timeLimit="{}">"#, limit);
                        }
                        None => xml.push_str("<Dial>"),
                    }
                    let _ = write!(
                        xml,
                        concat!(
                            r#"<Conference statusCallback="{}""#,
                            r#" statusCallbackEvent="start join leave end""#,
                            r#" statusCallbackMethod="POST""#,
                            r#" startConferenceOnEnter="{}""#,
                            r#" endConferenceOnExit="{}""#,
                            r#" record="{}""#,
                            r#" recordingStatusCallback="{}""#,
                            r#" recordingStatusCallbackMethod="POST">{}</Conference>"#,
                        ),
                        escape_xml(&options.status_callback),
                        options.start_conference_on_enter,
                        options.end_conference_on_exit,
                        if options.record {
                            "record-from-start"
                        } else {
                            "do-not-record"
                        },
                        escape_xml(&options.recording_status_callback),
                        escape_xml(name),
                    );
                    xml.push_str("</Dial>");
                }
                Verb::ConnectStream { action, url, name } => {
                    let _ = write!(
                        xml,
                        r#"<Connect action="{}" method="POST"><Stream url="{}" name="{}"/></Connect>"#,
                        escape_xml(action),
                        escape_xml(url),
                        escape_xml(name),
                    );
                }
            }
        }

        xml.push_str("</Response>");
        xml
    }
}

/// Escape text for use in XML content and attribute values
pub fn escape_xml(unsafe_text: &str) -> String {
    let mut escaped = String::with_capacity(unsafe_text.len());
    for c in unsafe_text.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '\'' => escaped.push_str("&apos;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
