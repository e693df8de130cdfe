//! Lua script implementing the atomic refill-and-consume step.
//!
//! Redis runs a script to completion before serving any other command, so
//! the read, refill, decide and write below are indivisible with respect to
//! every other client of the same server. `now` comes from the server's
//! `TIME`, so instances with skewed clocks still agree on elapsed time.
//!
//! The arithmetic mirrors `ratelimit_core::bucket::refill_and_consume`.

/// Atomic token bucket step.
///
/// KEYS[1] = bucket hash
/// ARGV[1] = capacity
/// ARGV[2] = refill rate (tokens per second)
/// ARGV[3] = requested tokens
/// ARGV[4] = expiry in seconds
///
/// Returns `{allowed (1|0), remaining, reset_in}`.
pub const TOKEN_BUCKET_SCRIPT: &str = r#"
    local key = KEYS[1]
    local capacity = tonumber(ARGV[1])
    local refill_rate = tonumber(ARGV[2])
    local requested = tonumber(ARGV[3])
    local ttl = tonumber(ARGV[4])
    local unbounded = 2147483647

    local time = redis.call('TIME')
    local now = tonumber(time[1])

    local bucket = redis.call('HMGET', key, 'tokens', 'lastRefill')
    local tokens = tonumber(bucket[1])
    local last_refill = tonumber(bucket[2])

    if last_refill == nil then
        tokens = capacity
        last_refill = now
    elseif tokens == nil then
        tokens = 0
    end

    local elapsed = math.max(0, now - last_refill)
    local refilled = math.max(0, math.min(capacity, tokens + elapsed * refill_rate))

    local function seconds_until(have)
        if refill_rate <= 0 then
            return unbounded
        end
        local secs = math.ceil((requested - have) / refill_rate)
        if have + secs * refill_rate < requested then
            secs = secs + 1
        end
        return math.min(unbounded, secs)
    end

    local allowed = 0
    local reset_in = 0
    if refilled >= requested then
        tokens = refilled - requested
        allowed = 1
        if tokens <= 0 then
            reset_in = seconds_until(tokens)
        end
    else
        tokens = refilled
        reset_in = seconds_until(refilled)
    end

    redis.call('HSET', key, 'tokens', string.format('%.17g', tokens), 'lastRefill', now)
    redis.call('EXPIRE', key, ttl)

    return {allowed, math.floor(tokens), reset_in}
"#;
