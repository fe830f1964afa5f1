//! Server-side token bucket script
//!
//! Runs the refill-and-take step inside the store so concurrent requests on one key
//! are serialized. Mirrors [`super::token_bucket::refill_and_take`].
//!
//! KEYS[1] bucket key; ARGV max tokens, window ms, now ms.
//! Returns `{admitted (0|1), tokens as a decimal string}`.

pub const TAKE_TOKEN: &str = r#"
local max_tokens = tonumber(ARGV[1])
local window_ms = tonumber(ARGV[2])
local now = tonumber(ARGV[3])

local fields = redis.call('HMGET', KEYS[1], 'tokens', 'last')
local tokens = tonumber(fields[1])
local last = tonumber(fields[2])
if tokens == nil or last == nil then
    tokens = max_tokens
    last = now
end

if window_ms > 0 then
    local elapsed = math.max(0, now - last)
    tokens = math.min(max_tokens, math.max(0, tokens) + elapsed * max_tokens / window_ms)
else
    tokens = max_tokens
end

local admitted = 0
if tokens >= 1 then
    tokens = tokens - 1
    admitted = 1
end

redis.call('HSET', KEYS[1], 'tokens', tostring(tokens), 'last', ARGV[3])
return {admitted, tostring(tokens)}
"#;
