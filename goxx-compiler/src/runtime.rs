//! C++ runtime support header
//!
//! Generated code leans on a small header-only library in namespace `goxx`:
//! slices, channels, the boxed `interface` and `error` values, defer stacks,
//! range adapters and the builtin functions. It is written next to the
//! generated sources unless the configuration points at an external copy.

/// File name the generated sources include
pub const RUNTIME_HEADER: &str = "goxx_runtime.h";

/// Contents of the runtime header
pub fn runtime_source() -> &'static str {
    RUNTIME_SOURCE
}

const RUNTIME_SOURCE: &str = r#"#pragma once

#include <algorithm>
#include <array>
#include <cstdint>
#include <functional>
#include <iostream>
#include <map>
#include <memory>
#include <mutex>
#include <condition_variable>
#include <deque>
#include <stdexcept>
#include <string>
#include <thread>
#include <tuple>
#include <type_traits>
#include <typeinfo>
#include <utility>
#include <vector>

namespace goxx {

// Root of every named type that satisfies a contract.
struct object {
    virtual ~object() = default;
};

constexpr int64_t npos = -1;

template <typename T>
struct slice {
    std::shared_ptr<std::vector<T>> data;
    int64_t offset = 0;
    int64_t length = 0;
    int64_t capacity = 0;

    slice() = default;
    slice(std::nullptr_t) {}
    slice(std::initializer_list<T> items)
        : data(std::make_shared<std::vector<T>>(items)),
          length(static_cast<int64_t>(items.size())),
          capacity(static_cast<int64_t>(items.size())) {}

    T &operator[](int64_t i) {
        if (i < 0 || i >= length) {
            throw std::out_of_range("index out of range");
        }
        return (*data)[offset + i];
    }
    const T &operator[](int64_t i) const {
        if (i < 0 || i >= length) {
            throw std::out_of_range("index out of range");
        }
        return (*data)[offset + i];
    }

    T *begin() { return data ? data->data() + offset : nullptr; }
    T *end() { return data ? data->data() + offset + length : nullptr; }
    const T *begin() const { return data ? data->data() + offset : nullptr; }
    const T *end() const { return data ? data->data() + offset + length : nullptr; }
};

template <typename T>
slice<T> slice_expr(const slice<T> &s, int64_t low, int64_t high, int64_t max) {
    if (high == npos) high = s.length;
    if (max == npos) max = s.capacity;
    if (low < 0 || high < low || max < high || max > s.capacity) {
        throw std::out_of_range("slice bounds out of range");
    }
    slice<T> out;
    out.data = s.data;
    out.offset = s.offset + low;
    out.length = high - low;
    out.capacity = max - low;
    return out;
}

inline std::string slice_expr(const std::string &s, int64_t low, int64_t high, int64_t) {
    if (high == npos) high = static_cast<int64_t>(s.size());
    return s.substr(static_cast<size_t>(low), static_cast<size_t>(high - low));
}

template <typename T, size_t N>
slice<T> slice_expr(std::array<T, N> &a, int64_t low, int64_t high, int64_t max) {
    slice<T> whole;
    whole.data = std::make_shared<std::vector<T>>(a.begin(), a.end());
    whole.length = static_cast<int64_t>(N);
    whole.capacity = static_cast<int64_t>(N);
    return slice_expr(whole, low, high, max);
}

template <typename T, bool Send = true, bool Recv = true>
struct channel {
    struct state {
        std::mutex mu;
        std::condition_variable cv;
        std::deque<T> items;
        size_t capacity = 0;
        bool closed = false;
    };
    std::shared_ptr<state> st;

    channel() = default;
    channel(std::nullptr_t) {}
    explicit channel(size_t capacity) : st(std::make_shared<state>()) { st->capacity = capacity; }

    template <bool S, bool R>
    channel(const channel<T, S, R> &other) : st(other.st) {}

    void send(T value) {
        std::unique_lock<std::mutex> lock(st->mu);
        if (st->closed) {
            throw std::runtime_error("send on closed channel");
        }
        st->cv.wait(lock, [&] { return st->items.size() <= st->capacity || st->closed; });
        st->items.push_back(std::move(value));
        st->cv.notify_all();
    }

    std::tuple<T, bool> recv_ok() {
        std::unique_lock<std::mutex> lock(st->mu);
        st->cv.wait(lock, [&] { return !st->items.empty() || st->closed; });
        if (st->items.empty()) {
            return {T{}, false};
        }
        T value = std::move(st->items.front());
        st->items.pop_front();
        st->cv.notify_all();
        return {std::move(value), true};
    }

    T recv() { return std::get<0>(recv_ok()); }

    void close() {
        std::lock_guard<std::mutex> lock(st->mu);
        st->closed = true;
        st->cv.notify_all();
    }
};

// Boxed value of the empty interface.
struct interface {
    std::shared_ptr<void> value;
    const std::type_info *type = nullptr;
    object *dynamic = nullptr;

    interface() = default;
    interface(std::nullptr_t) {}
};

template <typename T>
interface make_iface(T v) {
    interface out;
    auto held = std::make_shared<T>(std::move(v));
    out.type = &typeid(T);
    if constexpr (std::is_base_of_v<object, T>) {
        out.dynamic = held.get();
    } else if constexpr (std::is_pointer_v<T>) {
        if constexpr (std::is_base_of_v<object, std::remove_pointer_t<T>>) {
            out.dynamic = *held;
        }
    }
    out.value = held;
    return out;
}

// Value of the predeclared error contract.
struct error {
    std::shared_ptr<void> value;
    std::function<std::string()> message;

    error() = default;
    error(std::nullptr_t) {}

    std::string Error() const { return message ? message() : std::string("<nil>"); }
    explicit operator bool() const { return static_cast<bool>(message); }
};

template <typename T>
error make_error(T v) {
    error out;
    auto held = std::make_shared<T>(std::move(v));
    out.value = held;
    if constexpr (std::is_pointer_v<T>) {
        out.message = [held]() { return (*held)->Error(); };
    } else {
        out.message = [held]() { return held->Error(); };
    }
    return out;
}

// Named type over a basic type.
template <typename T>
struct basic {
    T value{};

    basic() = default;
    basic(T v) : value(v) {}
    operator T() const { return value; }
};

template <typename T>
bool is_zero(const T &v) {
    return v == T{};
}

inline bool is_zero(const std::string &v) { return v.empty(); }
template <typename T>
bool is_zero(const slice<T> &v) { return v.data == nullptr; }
// Maps are values: an empty map and a nil map are indistinguishable.
template <typename K, typename V>
bool is_zero(const std::map<K, V> &v) { return v.empty(); }
inline bool is_zero(const interface &v) { return v.type == nullptr; }
inline bool is_zero(const error &v) { return !v; }
template <typename F>
bool is_zero(const std::function<F> &v) { return !v; }
template <typename T, bool S, bool R>
bool is_zero(const channel<T, S, R> &v) { return v.st == nullptr; }
template <typename T, size_t N>
bool is_zero(const std::array<T, N> &v) {
    return std::all_of(v.begin(), v.end(), [](const T &x) { return is_zero(x); });
}

template <typename T>
bool is_nil(const T &v) { return is_zero(v); }

// Registered per type; the primary template matches the exact dynamic type.
template <typename T>
T *try_downcast(const interface &iface) {
    if (iface.type != nullptr && *iface.type == typeid(T)) {
        return static_cast<T *>(iface.value.get());
    }
    return nullptr;
}

template <typename T>
T *downcast_object(const interface &iface) {
    if (iface.type == nullptr) {
        return nullptr;
    }
    if (*iface.type == typeid(T)) {
        return static_cast<T *>(iface.value.get());
    }
    if (*iface.type == typeid(T *)) {
        return *static_cast<T **>(iface.value.get());
    }
    return dynamic_cast<T *>(iface.dynamic);
}

template <typename T>
bool implements(const interface &iface) {
    return try_downcast<T>(iface) != nullptr;
}

[[noreturn]] inline void panic(interface value);

template <typename T>
std::tuple<T, bool> try_assert(const interface &iface) {
    if constexpr (std::is_pointer_v<T> && std::is_base_of_v<object, std::remove_pointer_t<T>>) {
        if (iface.dynamic != nullptr) {
            if (auto *hit = dynamic_cast<T>(iface.dynamic)) {
                return {hit, true};
            }
        }
    }
    if (T *hit = try_downcast<T>(iface)) {
        return {*hit, true};
    }
    return {T{}, false};
}

template <typename T, typename S>
std::tuple<T, bool> try_assert(S *value) {
    if constexpr (std::is_pointer_v<T>) {
        if (auto *hit = dynamic_cast<T>(value)) {
            return {hit, true};
        }
    } else {
        if (auto *hit = dynamic_cast<T *>(value)) {
            return {*hit, true};
        }
    }
    return {T{}, false};
}

template <typename T>
T type_assert(const interface &iface) {
    auto [value, ok] = try_assert<T>(iface);
    if (!ok) {
        panic(make_iface<std::string>("interface conversion failed"));
    }
    return value;
}

template <typename T, typename S>
T type_assert(S *value) {
    auto [result, ok] = try_assert<T>(value);
    if (!ok) {
        panic(make_iface<std::string>("interface conversion failed"));
    }
    return result;
}

// Deferred calls of one function, run last-registered first on scope exit.
class defer {
public:
    defer() = default;
    defer(const defer &) = delete;
    defer &operator=(const defer &) = delete;
    ~defer() {
        for (auto it = calls_.rbegin(); it != calls_.rend(); ++it) {
            (*it)();
        }
    }
    void push(std::function<void()> call) { calls_.push_back(std::move(call)); }

private:
    std::vector<std::function<void()>> calls_;
};

// Range adapters snapshot their source, so temporaries are accepted.
template <typename C>
auto range_key_value(const C &c) {
    std::vector<std::tuple<int64_t, std::decay_t<decltype(*std::begin(c))>>> out;
    int64_t i = 0;
    for (auto &item : c) {
        out.emplace_back(i++, item);
    }
    return out;
}

template <typename K, typename V>
auto range_key_value(const std::map<K, V> &m) {
    std::vector<std::tuple<K, V>> out(m.begin(), m.end());
    return out;
}

// Decodes the UTF-8 sequence starting at byte i. Invalid or truncated
// encodings decode to U+FFFD with width 1.
inline std::tuple<int32_t, int64_t> decode_rune(const std::string &s, size_t i) {
    const auto lead = static_cast<unsigned char>(s[i]);
    if (lead < 0x80) {
        return {lead, 1};
    }
    const int width = lead >= 0xF0 ? 4 : lead >= 0xE0 ? 3 : lead >= 0xC0 ? 2 : 0;
    if (width == 0 || lead > 0xF4 || i + width > s.size()) {
        return {0xFFFD, 1};
    }
    int32_t rune = lead & (0x7F >> width);
    for (int k = 1; k < width; ++k) {
        const auto next = static_cast<unsigned char>(s[i + k]);
        if ((next & 0xC0) != 0x80) {
            return {0xFFFD, 1};
        }
        rune = (rune << 6) | (next & 0x3F);
    }
    static const int32_t min_rune[] = {0, 0, 0x80, 0x800, 0x10000};
    if (rune < min_rune[width] || rune > 0x10FFFF || (rune >= 0xD800 && rune <= 0xDFFF)) {
        return {0xFFFD, 1};
    }
    return {rune, width};
}

// (byte offset, rune) for every code point of s.
inline auto range_key_value(const std::string &s) {
    std::vector<std::tuple<int64_t, int32_t>> out;
    for (size_t i = 0; i < s.size();) {
        auto [rune, width] = decode_rune(s, i);
        out.emplace_back(static_cast<int64_t>(i), rune);
        i += static_cast<size_t>(width);
    }
    return out;
}

template <typename C>
auto range_key(const C &c) {
    std::vector<int64_t> out;
    for (int64_t i = 0; i < static_cast<int64_t>(std::size(c)); ++i) {
        out.push_back(i);
    }
    return out;
}

template <typename T>
auto range_key(const slice<T> &s) {
    std::vector<int64_t> out;
    for (int64_t i = 0; i < s.length; ++i) {
        out.push_back(i);
    }
    return out;
}

template <typename K, typename V>
auto range_key(const std::map<K, V> &m) {
    std::vector<K> out;
    for (auto &entry : m) {
        out.push_back(entry.first);
    }
    return out;
}

inline auto range_key(const std::string &s) {
    std::vector<int64_t> out;
    for (auto &[offset, rune] : range_key_value(s)) {
        (void)rune;
        out.push_back(offset);
    }
    return out;
}

inline auto range_key(int64_t n) {
    std::vector<int64_t> out;
    for (int64_t i = 0; i < n; ++i) {
        out.push_back(i);
    }
    return out;
}

template <typename C>
auto range_value(const C &c) {
    std::vector<std::decay_t<decltype(*std::begin(c))>> out(std::begin(c), std::end(c));
    return out;
}

template <typename K, typename V>
auto range_value(const std::map<K, V> &m) {
    std::vector<V> out;
    for (auto &entry : m) {
        out.push_back(entry.second);
    }
    return out;
}

inline auto range_value(const std::string &s) {
    std::vector<int32_t> out;
    for (auto &[offset, rune] : range_key_value(s)) {
        (void)offset;
        out.push_back(rune);
    }
    return out;
}

template <typename C>
auto range_void(const C &c) {
    return range_key(c);
}

template <typename K, typename V>
std::tuple<V, bool> map_lookup(const std::map<K, V> &m, const K &key) {
    auto it = m.find(key);
    if (it == m.end()) {
        return {V{}, false};
    }
    return {it->second, true};
}

template <typename T>
int64_t len(const slice<T> &s) { return s.length; }
inline int64_t len(const std::string &s) { return static_cast<int64_t>(s.size()); }
template <typename K, typename V>
int64_t len(const std::map<K, V> &m) { return static_cast<int64_t>(m.size()); }
template <typename T, size_t N>
int64_t len(const std::array<T, N> &) { return static_cast<int64_t>(N); }
template <typename T, bool S, bool R>
int64_t len(const channel<T, S, R> &c) {
    if (!c.st) return 0;
    std::lock_guard<std::mutex> lock(c.st->mu);
    return static_cast<int64_t>(c.st->items.size());
}

template <typename T>
int64_t cap(const slice<T> &s) { return s.capacity; }
template <typename T, size_t N>
int64_t cap(const std::array<T, N> &) { return static_cast<int64_t>(N); }

template <typename T>
slice<T> grow(const slice<T> &s, int64_t needed) {
    if (s.data && s.offset + needed <= static_cast<int64_t>(s.data->size())) {
        slice<T> out = s;
        out.length = needed;
        return out;
    }
    int64_t capacity = std::max<int64_t>(needed, s.capacity * 2);
    slice<T> out;
    out.data = std::make_shared<std::vector<T>>();
    out.data->reserve(static_cast<size_t>(capacity));
    for (int64_t i = 0; i < s.length; ++i) {
        out.data->push_back((*s.data)[s.offset + i]);
    }
    out.data->resize(static_cast<size_t>(capacity));
    out.length = needed;
    out.capacity = capacity;
    return out;
}

template <typename T, typename... Items>
slice<T> append(slice<T> s, Items &&...items) {
    int64_t start = s.length;
    slice<T> out = grow(s, s.length + static_cast<int64_t>(sizeof...(items)));
    ((out[start++] = T(std::forward<Items>(items))), ...);
    return out;
}

template <typename T>
slice<T> append_all(slice<T> s, const slice<T> &items) {
    int64_t start = s.length;
    slice<T> out = grow(s, s.length + items.length);
    for (int64_t i = 0; i < items.length; ++i) {
        out[start + i] = items[i];
    }
    return out;
}

inline slice<uint8_t> append_all(slice<uint8_t> s, const std::string &items) {
    for (char c : items) {
        s = append(s, static_cast<uint8_t>(c));
    }
    return s;
}

template <typename T>
int64_t copy(slice<T> dst, const slice<T> &src) {
    int64_t n = std::min(dst.length, src.length);
    std::vector<T> staged(src.begin(), src.begin() + n);
    for (int64_t i = 0; i < n; ++i) {
        dst[i] = staged[static_cast<size_t>(i)];
    }
    return n;
}

template <typename T>
struct maker {
    static T make() { return T{}; }
};

template <typename T>
struct maker<slice<T>> {
    static slice<T> make(int64_t length = 0, int64_t capacity = npos) {
        if (capacity == npos) capacity = length;
        slice<T> out;
        out.data = std::make_shared<std::vector<T>>(static_cast<size_t>(capacity));
        out.length = length;
        out.capacity = capacity;
        return out;
    }
};

template <typename T, bool S, bool R>
struct maker<channel<T, S, R>> {
    static channel<T, S, R> make(int64_t capacity = 0) {
        return channel<T, S, R>(static_cast<size_t>(capacity));
    }
};

template <typename K, typename V>
struct maker<std::map<K, V>> {
    static std::map<K, V> make(int64_t = 0) { return {}; }
};

template <typename T, typename... Sizes>
T make(Sizes... sizes) {
    return maker<T>::make(static_cast<int64_t>(sizes)...);
}

template <typename K, typename V>
void remove(std::map<K, V> &m, const K &key) { m.erase(key); }

template <typename K, typename V>
void clear(std::map<K, V> &m) { m.clear(); }
template <typename T>
void clear(slice<T> &s) {
    for (auto &item : s) {
        item = T{};
    }
}

template <typename T, bool S, bool R>
void close(channel<T, S, R> &c) { c.close(); }

// Carries a panic value through C++ unwinding.
struct panic_error : std::runtime_error {
    interface value;
    explicit panic_error(interface v) : std::runtime_error("panic"), value(std::move(v)) {}
};

[[noreturn]] inline void panic(interface value) { throw panic_error(std::move(value)); }

inline void print_one(const std::string &v) { std::cerr << v; }
inline void print_one(bool v) { std::cerr << (v ? "true" : "false"); }
template <typename T>
void print_one(const T &v) {
    if constexpr (std::is_arithmetic_v<T>) {
        std::cerr << +v;
    } else {
        std::cerr << "<value>";
    }
}

template <typename... Args>
void print(const Args &...args) {
    (print_one(args), ...);
}

template <typename... Args>
void println(const Args &...args) {
    bool first = true;
    ((std::cerr << (first ? "" : " "), print_one(args), first = false), ...);
    std::cerr << '\n';
}

template <typename F>
void go(F &&f) {
    std::thread(std::forward<F>(f)).detach();
}

template <typename T, typename... Rest>
T min(T first, Rest... rest) {
    T out = first;
    ((out = rest < out ? T(rest) : out), ...);
    return out;
}

template <typename T, typename... Rest>
T max(T first, Rest... rest) {
    T out = first;
    ((out = rest > out ? T(rest) : out), ...);
    return out;
}

} // namespace goxx
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_is_a_header() {
        let source = runtime_source();
        assert!(source.starts_with("#pragma once\n"));
        assert!(source.contains("namespace goxx {"));
        assert!(source.trim_end().ends_with("} // namespace goxx"));
    }

    #[test]
    fn test_defer_runs_in_reverse_registration_order() {
        let source = runtime_source();
        let defer = source.find("class defer {").unwrap();
        let body = &source[defer..];
        let destructor = body.find("~defer()").unwrap();
        assert!(body[destructor..].contains("calls_.rbegin()"));
        assert!(body.contains("calls_.push_back(std::move(call));"));
    }

    #[test]
    fn test_every_emitted_helper_is_defined() {
        let source = runtime_source();
        for helper in [
            "struct slice",
            "slice_expr(",
            "struct channel",
            "struct interface",
            "make_iface(",
            "struct error",
            "make_error(",
            "struct basic",
            "bool is_zero(",
            "T *try_downcast(",
            "T *downcast_object(",
            "try_assert(",
            "T type_assert(",
            "class defer",
            "range_key_value(",
            "range_key(",
            "range_value(",
            "range_void(",
            "map_lookup(",
            "len(",
            "cap(",
            "append(",
            "append_all(",
            "copy(",
            "T make(",
            "void remove(",
            "void clear(",
            "void close(",
            "void panic(",
            "void print(",
            "void println(",
            "void go(",
            "T min(",
            "T max(",
        ] {
            assert!(source.contains(helper), "runtime lacks `{}`", helper);
        }
        assert!(!source.contains("recover("));
    }

    #[test]
    fn test_range_adapters_accept_temporaries() {
        let source = runtime_source();
        for adapter in ["range_key_value", "range_key", "range_value", "range_void"] {
            let generic = format!("auto {}(const C &c) {{", adapter);
            assert!(source.contains(&generic), "`{}` binds its source by mutable reference", adapter);
        }
        assert!(!source.contains("(C &c)"));
        assert!(!source.contains("(std::map<K, V> &m)"));
    }

    #[test]
    fn test_map_is_zero_when_empty() {
        let source = runtime_source();
        assert!(source.contains("bool is_zero(const std::map<K, V> &v) { return v.empty(); }"));
    }

    #[test]
    fn test_string_range_decodes_runes() {
        let source = runtime_source();
        assert!(source.contains("inline std::tuple<int32_t, int64_t> decode_rune(const std::string &s, size_t i) {"));
        assert!(source.contains("std::vector<std::tuple<int64_t, int32_t>> out;"));
        assert!(source.contains("inline auto range_key(const std::string &s) {"));
        assert!(source.contains("inline auto range_value(const std::string &s) {"));
        // Invalid sequences fall back to the replacement character
        assert!(source.contains("return {0xFFFD, 1};"));
    }
}
