//! Minimal TwiML rendering for the verbs the webhooks emit.

const XML_HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceVerb {
    Gather {
        num_digits: u32,
        timeout_secs: u32,
        action: String,
        prompt: String,
    },
    Redirect {
        url: String,
    },
    Dial {
        action: String,
        timeout_secs: u32,
        number: String,
    },
    Hangup,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceResponse {
    verbs: Vec<VoiceVerb>,
}

impl VoiceResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn verb(mut self, verb: VoiceVerb) -> Self {
        self.verbs.push(verb);
        self
    }

    pub fn verbs(&self) -> &[VoiceVerb] {
        &self.verbs
    }

    pub fn to_xml(&self) -> String {
        let mut twiml = format!("{XML_HEADER}<Response>");
        for verb in &self.verbs {
            match verb {
                VoiceVerb::Gather {
                    num_digits,
                    timeout_secs,
                    action,
                    prompt,
                } => twiml.push_str(&format!(
                    "<Gather numDigits=\"{}\" timeout=\"{}\" action=\"{}\" method=\"POST\"><Say>{}</Say></Gather>",
                    num_digits,
                    timeout_secs,
                    escape_xml(action),
                    escape_xml(prompt)
                )),
                VoiceVerb::Redirect { url } => twiml.push_str(&format!(
                    "<Redirect method=\"POST\">{}</Redirect>",
                    escape_xml(url)
                )),
                VoiceVerb::Dial {
                    action,
                    timeout_secs,
                    number,
                } => twiml.push_str(&format!(
                    "<Dial action=\"{}\" method=\"POST\" timeout=\"{}\"><Number>{}</Number></Dial>",
                    escape_xml(action),
                    timeout_secs,
                    escape_xml(number)
                )),
                VoiceVerb::Hangup => twiml.push_str("<Hangup/>"),
            }
        }
        twiml.push_str("</Response>");
        twiml
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagingResponse {
    messages: Vec<String>,
}

impl MessagingResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(mut self, body: &str) -> Self {
        self.messages.push(body.to_string());
        self
    }

    pub fn to_xml(&self) -> String {
        let mut twiml = format!("{XML_HEADER}<Response>");
        for body in &self.messages {
            twiml.push_str(&format!("<Message>{}</Message>", escape_xml(body)));
        }
        twiml.push_str("</Response>");
        twiml
    }
}

pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
