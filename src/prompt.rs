//! System instruction and user-turn construction
//!
//! Pure functions of `(mode, language, count)`; the item count is
//! injected so deployments can tune it per mode in config.

use crate::{GenerationRequest, Language, Mode};

const PERSONA: &str = "\
You are \"M-Star AI Studio\", an expert viral content strategist and professional copywriter.
Your goal is to generate high-quality, real-world usable content for social media and professional use.";

const CONTENT_RULES: &str = "\
CONTENT RULES:
- No moral lectures, disclaimers or warnings. Deliver the content directly.
- Keep every line concise and punchy.
- Use emojis sparingly: at most one or two per item, none where the mode says so.
- Every item must be unique; never repeat an idea with different words.";

const OUTPUT_CONTRACT: &str = "\
OUTPUT FORMAT (MANDATORY):
Return exactly ONE JSON object of the shape {\"results\": [\"item 1\", \"item 2\"]}.
Each item is a single string. Do not add explanations, prose, or markdown code fences before or after the JSON.";

/// Directive naming the only language the model may answer in
pub fn language_directive(language: Language) -> &'static str
{   match language
    {   Language::Hinglish => {
          "LANGUAGE: Reply ONLY in Hinglish (Hindi + English mix written in Roman script)."
        }
      , Language::Hindi => {
          "LANGUAGE: Reply ONLY in Hindi (Devanagari script only)."
        }
      , Language::English => "LANGUAGE: Reply ONLY in English."
    }
}

/// Phrase embedded in every mode block; tests look for it
pub fn count_directive(count: usize) -> String
{   format!("Output exactly {} items.", count)
}

fn mode_block(mode: Mode, count: usize) -> String
{   let n = count_directive(count);
    match mode
    {   Mode::Auto => format!(
          "MODE: Auto Detect\n\
           - Detect the user's intent and pick the best-fitting mode \
           (roast, compliment, shayari, quotes, bio, caption, status, \
           stylish name, hashtag, script, description, title).\n\
           - {}\n\
           - Follow the style of the mode you picked.",
          n
        )
      , Mode::Roast => format!(
          "MODE: Roast\n\
           - {}\n\
           - Savage, witty, sarcastic one-liners. A bit mean but harmless.",
          n
        )
      , Mode::Compliment => format!(
          "MODE: Compliment\n\
           - {}\n\
           - Warm, specific, charming lines that feel personal, never generic.",
          n
        )
      , Mode::Shayari => format!(
          "MODE: Shayari\n\
           - {}\n\
           - Strict rhyme (kafiya) and meter.\n\
           - Each item is a 2-line sher or a 4-line quatrain; separate lines with '\\n'.\n\
           - Use deep Urdu/Hindi words (ishq, zindagi, dard).",
          n
        )
      , Mode::Quotes => format!(
          "MODE: Quotes\n\
           - {}\n\
           - Deep, memorable, shareable quotes of one or two lines.",
          n
        )
      , Mode::Bio => format!(
          "MODE: Bio\n\
           - {}\n\
           - Aesthetic or attitude social media bios, each under 150 characters.",
          n
        )
      , Mode::Caption => format!(
          "MODE: Caption\n\
           - {}\n\
           - Viral photo captions of one or two lines.",
          n
        )
      , Mode::Status => format!(
          "MODE: Status\n\
           - {}\n\
           - Short attitude or mood status lines for messaging apps.",
          n
        )
      , Mode::StylishName => format!(
          "MODE: Stylish Name\n\
           - {}\n\
           - Convert the given text into visually distinct Unicode font styles: \
           𝐁𝐨𝐥𝐝, 𝐼𝑡𝑎𝑙𝑖𝑐, 𝕲𝖔𝖙𝖍𝖎𝖈, 𝒞𝓊𝓇𝓈𝒾𝓋𝑒, Ⓒⓘⓡⓒⓛⓔⓓ, Ｓｐａｃｅｄ and similar.\n\
           - No emojis, only the styled text.",
          n
        )
      , Mode::Hashtag => format!(
          "MODE: Hashtag\n\
           - {}\n\
           - Each item is one highly relevant, niche-specific hashtag starting with '#'.",
          n
        )
      , Mode::Script => format!(
          "MODE: Script Writing (YouTube Shorts / Reels)\n\
           - {}\n\
           - Each item is one complete script. Use '\\n' for line breaks, structured as:\n\
           TITLE: [catchy title]\\n\\n[HOOK]: (0-3s hook that stops the scroll)\\n\\n\
           [SCENE]: (brief visual direction)\\n\\n[BODY]: (fast-paced main content)\\n\\n\
           [CTA]: (strong call to action)",
          n
        )
      , Mode::Description => format!(
          "MODE: Description Writing (Instagram / YouTube)\n\
           - {}\n\
           - Each item uses '\\n' for line breaks, structured as:\n\
           [hook line]\\n\\n[engaging summary]\\n\\nKey Points:\\n• [point 1]\\n• [point 2]\\n• [point 3]\\n\\n[relevant SEO hashtags]",
          n
        )
      , Mode::Title => format!(
          "MODE: Title Generator (YouTube / Blog)\n\
           - {}\n\
           - High click-through titles using curiosity gaps, negativity bias, \"How To\" and listicle numbers.",
          n
        )
    }
}

/// Build the system instruction sent as the behavioral contract
pub fn system_instruction(
  mode: Mode
, language: Language
, count: usize
) -> String
{   format!(
      "{}\n\n{}\n\n{}\n\n{}\n\n{}",
      PERSONA,
      language_directive(language),
      CONTENT_RULES,
      mode_block(mode, count),
      OUTPUT_CONTRACT
    )
}

/// User turn for one request; auto mode asks the model to pick
pub fn user_turn(request: &GenerationRequest, count: usize) -> String
{   let prompt = request.prompt.trim();
    match request.mode
    {   Mode::Auto => format!(
          "User Input: \"{}\". Detect the intent, pick the best-fitting mode \
           and generate {} items for it in {}.",
          prompt, count, request.language
        )
      , mode => format!(
          "Generate {} {} items for: \"{}\" in {}.",
          count, mode, prompt, request.language
        )
    }
}
