/// Prompts for the two lookup stages

pub const SYSTEM_PROMPT: &str = "You are a research assistant with live access to X (Twitter). \
Answer strictly in the format requested, without commentary.";

pub fn existence_prompt(wallet: &str) -> String {
    format!(
        "Search X for any posts containing the exact phrase \"{wallet}\". \
Respond with only \"true\" if any post exists, or \"false\" if no posts are found. \
Do not provide any other information."
    )
}

pub fn ownership_prompt(wallet: &str) -> String {
    format!(
        "Search X for all posts containing the exact phrase \"{wallet}\".

Analyze the context of each post to determine:
1. Who posted it (username/handle)
2. Whether this wallet address belongs to that user (confidence level: high, medium, low, or none)

Confidence level guidelines:
- \"High\": Clear ownership (user's own post in an airdrop thread, wallet sharing, profile bio, explicit ownership statements)
- \"Medium\": Strong indication (user sharing their wallet for donations, trading, or in the context of their activity)
- \"Low\": Weak indication (user just mentioned or quoted it, minimal context)
- \"None\": Very weak or no indication of ownership

Return the username and confidence level in this format:
Username: @handle
Confidence: [High|Medium|Low|None]

If multiple posts exist, analyze all of them and provide the highest confidence level with the associated username."
    )
}
