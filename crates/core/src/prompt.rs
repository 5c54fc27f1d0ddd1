//! Prompt construction for the classification model.
//!
//! A pure function from a sanitized [`AnalysisRequest`] to the
//! natural-language instruction sent to the model, plus a flag telling
//! the client to attach the audio payload as a multi-part message.

use crate::message::{AnalysisRequest, MessageType};

/// The instruction text and attachment flag for one classification call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisPrompt {
    pub text: String,
    /// When true the client sends a multi-part user message with the
    /// request's audio payload attached.
    pub attach_audio: bool,
}

/// Build the prompt for a request.
///
/// The audio template is used if and only if the message is a call AND
/// an audio payload is present; a call reported with only a transcript
/// goes through the text template like any other message.
pub fn build(request: &AnalysisRequest) -> AnalysisPrompt {
    let attach_audio = request.message_type == MessageType::Call && request.audio_data.is_some();
    let text = if attach_audio {
        audio_prompt(request)
    } else {
        text_prompt(request)
    };
    AnalysisPrompt { text, attach_audio }
}

fn subject_line(request: &AnalysisRequest) -> String {
    match &request.subject {
        Some(subject) => format!("Subject: {subject}\n"),
        None => String::new(),
    }
}

fn text_prompt(request: &AnalysisRequest) -> String {
    format!(
        r#"Analyze the following {message_type} for scam, phishing, or suspicious content.

Sender: {sender}
{subject_line}Content: {content}

Provide a detailed analysis in JSON format with:
1. risk_level: "safe", "suspicious", "scam", or "phishing"
2. risk_score: number between 0 and 1 (0 = completely safe, 1 = definite scam)
3. flagged_reasons: array of specific reasons why this was flagged (e.g., "Suspicious domain", "Urgency tactics", "Too good to be true")
4. analysis: detailed explanation of why you classified it this way
5. recommendations: what the user should do

Focus on detecting:
- Phishing attempts (fake login pages, credential theft)
- Scam patterns (too good to be true offers, fake prizes)
- Suspicious urgency tactics
- Mismatched domains or spoofed sender addresses
- Requests for sensitive information
- Suspicious links or attachments
- Social engineering attempts

Return ONLY valid JSON, no additional text."#,
        message_type = request.message_type,
        sender = request.sender,
        subject_line = subject_line(request),
        content = request.content.as_deref().unwrap_or(""),
    )
}

fn audio_prompt(request: &AnalysisRequest) -> String {
    format!(
        r#"Analyze this phone call recording for scam, phishing, or suspicious content.

Sender: {sender}
{subject_line}
Listen to the audio recording and analyze for:
- Voice characteristics and authenticity (robotic/synthetic voice, accent inconsistencies)
- Urgency or pressure tactics
- Requests for personal or financial information
- Background noises suggesting call center or spoofed number
- Script-like speech patterns common in scams
- Too-good-to-be-true offers or threats
- Social engineering techniques

Provide a detailed analysis in JSON format with:
1. risk_level: "safe", "suspicious", "scam", or "phishing"
2. risk_score: number between 0 and 1 (0 = completely safe, 1 = definite scam)
3. flagged_reasons: array of specific reasons (e.g., "Robotic voice", "Pressure tactics", "Suspicious background noise")
4. analysis: detailed explanation based on what you hear
5. recommendations: what the user should do

Return ONLY valid JSON, no additional text."#,
        sender = request.sender,
        subject_line = subject_line(request),
    )
}
