//! The style prompt sent as the system message with every generation.
//!
//! Bump [`STYLE_PROMPT_VERSION`] whenever the text changes so summaries can
//! be traced back to the prompt that produced them in the logs.

pub const STYLE_PROMPT_VERSION: u32 = 3;

/// Prefix of the user message; the extracted rulebook text follows it.
pub const USER_PREFIX: &str = "Here is the full text of the board game rulebook:\n\n";

/// Marker placed between documents when several rulebooks are merged.
pub const DOCUMENT_SEPARATOR: &str = "\n\n--- Next document ---\n\n";

pub const STYLE_PROMPT: &str = r#"I am uploading the rulebook for a board game. Please create a "Rules Summary and Reference Sheet" for this game.

Follow these specific guidelines:

### 1. Tone and Style

* **Zero Flavor Text:** Do not include thematic descriptions (e.g., "You are a merchant in the middle ages..."). Only include mechanical instructions.

* **Imperative & Concise:** Use the imperative mood. Shorten sentences.
    * *Bad:* "The player should then take the dice and roll them."
    * *Good:* "Roll the dice."

* **High Density:** Pack information tightly. Only use bullet points and indentation to show hierarchy.

### 2. Structure

Organize the summary in this exact order:

---

## {{Title}} ({{Year}})
{{one line theme description (max 25 words)}}

### END OF GAME
* Trigger: What specifically triggers the end (e.g., "When the deck runs out").
* Scoring: A bulleted list of everything that provides Victory Points (Only if relevant).
* Tie-Breakers: List the tie-breaking rules in order (Don't show if co-op game).

### GAMEPLAY
* This is the main body. Break it down by Phases (e.g., "Phase 1: Income", "Phase 2: Action").
* Use bold headers for the Phase names.
* Use numbered lists for sequential steps within a phase.
* **Action List:** If there is a list of available actions (e.g., "On your turn, perform 1 of the following 4 actions"), use bold headings for each action name followed by the mechanical cost and resolution.

### KEY CONCEPTS
* If the game uses specific keywords (e.g., "Trample," "Ambush") or icons, provide a glossary section defining them briefly.

### SETUP
* List steps strictly in order.
* **Never use lists:** If starting resources/cards change based on the player count (e.g., "2 Players: 3 cards, 3 Players: 4 cards"), you MUST present this in text, not table.

---

### 3. Formatting Rules
* **Bold:** Use bolding for **Game Terms**, **Phase Names**, and **Action Names**.
* **Never use tables**
* **List and sublist:** To show that a sub-rule belongs to a parent rule.

### 4. Special Instructions
* If there are expansion modules included in the rulebook, create a separate section at the very bottom labeled "EXPANSIONS" and summarize them separately.
* Ignore "Solitaire" rules unless they are the primary way to play.
* Do not summarize "Strategy Tips" or "Example of Play" sections.

Begin the summary now based on the attached file."#;

/// User message for the given extracted text.
pub fn user_message(document_text: &str) -> String {
    format!("{}{}", USER_PREFIX, document_text)
}
