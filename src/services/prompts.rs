//! Prompt templates, one pure function per stage.

use crate::models::AddOn;

/// Niches with a curated chapter plan. `{audience}` is replaced with the target audience.
const NICHE_CHAPTERS: &[(&str, &[&str])] = &[
    (
        "real estate",
        &[
            "Reading the Market Like a Pro",
            "Financing Your First Deal",
            "Finding Undervalued Properties",
            "Negotiating Offers That Win",
            "Renovations That Pay for Themselves",
            "Managing Tenants Without Stress",
            "Scaling a Portfolio for {audience}",
        ],
    ),
    (
        "personal finance",
        &[
            "Where Your Money Really Goes",
            "Building a Budget That Sticks",
            "Crushing Debt Step by Step",
            "Your Emergency Fund Blueprint",
            "Investing Basics for {audience}",
            "Automating Your Wealth",
        ],
    ),
    (
        "health & fitness",
        &[
            "Resetting Your Daily Habits",
            "Nutrition Without the Noise",
            "Training Plans for {audience}",
            "Sleep and Recovery",
            "Staying Consistent When Life Gets Busy",
            "Tracking Progress That Matters",
        ],
    ),
    (
        "spiritual awakening & energy vibration",
        &[
            "Recognizing the Call to Awaken",
            "Understanding Your Energy Field",
            "Daily Practices to Raise Your Vibration",
            "Releasing Blocks and Old Patterns",
            "Meditation for {audience}",
            "Living in Alignment",
        ],
    ),
    (
        "productivity",
        &[
            "Clarity Before Action",
            "Designing Your Ideal Week",
            "Deep Work for {audience}",
            "Beating Procrastination",
            "Systems Over Willpower",
        ],
    ),
];

/// Curated chapter titles for `niche`, or `None` when the niche is unknown or
/// has fewer than `count` titles. `None` means the model suggests titles.
pub fn predefined_chapter_titles(niche: &str, audience: &str, count: usize) -> Option<Vec<String>> {
    let key = niche.trim().to_lowercase();
    let (_, templates) = NICHE_CHAPTERS.iter().find(|(name, _)| *name == key)?;
    if templates.len() < count {
        return None;
    }
    Some(
        templates
            .iter()
            .take(count)
            .map(|template| template.replace("{audience}", audience))
            .collect(),
    )
}

pub fn title(niche: &str, audience: &str, book_type: &str) -> String {
    format!(
        "Generate a short, powerful ebook title for the niche: {niche}.\n\
         Format: {book_type}. Audience: {audience}.\n\
         Reply with the title only, no quotes and no explanation."
    )
}

pub fn subtitle(title: &str, niche: &str) -> String {
    format!(
        "Generate a catchy subtitle for the ebook \"{title}\" in the {niche} niche.\n\
         Reply with the subtitle only."
    )
}

pub fn introduction(title: &str, subtitle: &str, audience: &str) -> String {
    format!(
        "Write the introduction for the ebook \"{title}\" ({subtitle}).\n\
         Speak directly to {audience}: name their problem, promise the transformation, \
         and explain how the book is organized.\n\
         Tone: professional, inspirational, concise. 250 to 400 words. \
         Plain paragraphs separated by blank lines, no headings."
    )
}

pub fn outline(title: &str, niche: &str, audience: &str, count: usize) -> String {
    format!(
        "List exactly {count} chapter titles for the ebook \"{title}\" in the {niche} niche, \
         written for {audience}.\n\
         Reply as a numbered list, one title per line, nothing else."
    )
}

pub fn chapter(
    title: &str,
    index: usize,
    chapter_title: &str,
    outline: &str,
    audience: &str,
) -> String {
    format!(
        "Write chapter {index} of the ebook \"{title}\": \"{chapter_title}\".\n\
         The full outline of the book is:\n{outline}\n\n\
         Write for {audience}. Give practical, actionable guidance and include one short \
         case study woven into the text. 600 to 900 words, plain paragraphs separated by \
         blank lines, no chapter heading.\n\
         Finish with a line that reads \"Action Plan:\" followed by 3 to 5 concrete steps."
    )
}

pub fn bonus(title: &str, add_on: AddOn, outline: &str) -> String {
    let brief = match add_on {
        AddOn::Workbook => "exercises and reflection questions for each chapter",
        AddOn::Checklist => "a concise quick-start checklist a reader can finish in one day",
        AddOn::Templates => "fill-in-the-blank templates the reader can copy and use",
        AddOn::AudioScript => "a warm, spoken-word script summarizing the book in 5 minutes",
        AddOn::EmailSwipeFile => "five ready-to-send promotional emails for the book",
        AddOn::ResourceGuide => "a curated list of tools, books and habits that support the book",
    };
    format!(
        "Write the bonus \"{label}\" for the ebook \"{title}\": {brief}.\n\
         Book outline:\n{outline}\n\n\
         Plain text, short paragraphs or numbered items.",
        label = add_on.label()
    )
}

pub fn sales_copy(title: &str, subtitle: &str, niche: &str, audience: &str) -> String {
    format!(
        "Write a high-converting product description for the ebook \"{title}\" ({subtitle}).\n\
         Niche: {niche}. Target audience: {audience}.\n\
         Include benefits, who it is for, and a strong call to action. \
         Plain paragraphs, no headings."
    )
}

pub fn ad_hooks(title: &str, audience: &str, count: usize) -> String {
    format!(
        "Write {count} short ad hooks (under 15 words each) to promote the ebook \"{title}\" \
         to {audience}.\n\
         Reply as a numbered list, one hook per line."
    )
}

pub fn cover_prompt(title: &str, niche: &str) -> String {
    format!(
        "Create a professional AI image prompt for an ebook cover titled \"{title}\" in the \
         {niche} niche. Minimalist and premium style. Reply with the prompt only."
    )
}
