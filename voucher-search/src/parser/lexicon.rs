//! Pattern tables for Vietnamese query understanding.
//!
//! Every concept carries two pattern sets: one matched against the
//! normalized (diacritic-bearing) form and one against the stripped form, so
//! queries typed without diacritics parse the same way. Patterns are regex
//! sources; plain phrases additionally qualify for the exact-substring bonus
//! during intent scoring.

use crate::record::QueryIntent;

/// Pattern pair for one concept.
pub struct PatternSet {
    /// Matched against the diacritic-bearing normalized form.
    pub accented: &'static [&'static str],
    /// Matched against the diacritic-stripped form.
    pub stripped: &'static [&'static str],
}

/// Intent detection table. Order follows [`QueryIntent::DETECTABLE`].
pub const INTENTS: &[(QueryIntent, PatternSet)] = &[
    (
        QueryIntent::FindBeauty,
        PatternSet {
            accented: &["làm đẹp", "spa", "massage", "salon", "nail", "tóc", "chăm sóc da"],
            stripped: &["lam dep", "toc", "cham soc da"],
        },
    ),
    (
        QueryIntent::FindEntertainment,
        PatternSet {
            accented: &["giải trí", "vui chơi", "trò chơi", "sự kiện", "game", "show", "rạp phim"],
            stripped: &["giai tri", "vui choi", "tro choi", "su kien", "rap phim"],
        },
    ),
    (
        QueryIntent::FindHotel,
        PatternSet {
            accented: &["khách sạn", "resort", "homestay", "villa", "nơi ở", "nghỉ dưỡng", "hotel", "ở lại"],
            stripped: &["khach san", "noi o", "nghi duong", "o lai"],
        },
    ),
    (
        QueryIntent::FindKids,
        PatternSet {
            accented: &["trẻ em", "trẻ con", "em bé", "đồ chơi", "khu vui chơi", "playground", "kids", "children", "gia đình.*trẻ"],
            stripped: &["tre em", "tre con", "em be", "do choi", "khu vui choi", "gia dinh.*tre"],
        },
    ),
    (
        QueryIntent::FindRestaurant,
        PatternSet {
            accented: &["quán ăn", "nhà hàng", "ăn uống", "buffet", "thức ăn", "món ăn", "bữa ăn", "quán cafe", "cà phê", "đói", "muốn ăn", "restaurant", "dining"],
            stripped: &["quan an", "nha hang", "an uong", "thuc an", "mon an", "bua an", "quan cafe", "ca phe", "doi", "muon an"],
        },
    ),
    (
        QueryIntent::FindShopping,
        PatternSet {
            accented: &["mua sắm", "cửa hàng", "siêu thị", "mall", "shopping", "tìm mua"],
            stripped: &["mua sam", "cua hang", "sieu thi", "tim mua"],
        },
    ),
    (
        QueryIntent::FindTravel,
        PatternSet {
            accented: &["du lịch", "tour", "vé máy bay", "nghỉ mát", "tham quan"],
            stripped: &["du lich", "ve may bay", "nghi mat"],
        },
    ),
];

/// Service-requirement tags.
pub const SERVICES: &[(&str, PatternSet)] = &[
    (
        "kids_friendly",
        PatternSet {
            accented: &["trẻ em", "trẻ con", "em bé", "khu vui chơi", "playground", "chỗ.*chơi", "cho.*trẻ.*chơi"],
            stripped: &["tre em", "tre con", "em be", "khu vui choi", "cho.*tre.*choi"],
        },
    ),
    (
        "romantic",
        PatternSet {
            accented: &["lãng mạn", "hẹn hò", "cặp đôi", "romantic", "không gian.*riêng tư"],
            stripped: &["lang man", "hen ho", "cap doi", "khong gian.*rieng tu"],
        },
    ),
    (
        "group_dining",
        PatternSet {
            accented: &["nhóm", "công ty", "tiệc", "đông người", "tập thể"],
            stripped: &["nhom", "cong ty", "tiec", "dong nguoi", "tap the"],
        },
    ),
    (
        "luxury",
        PatternSet {
            accented: &["sang trọng", "cao cấp", "đẳng cấp", "vip", "luxury", "premium"],
            stripped: &["sang trong", "cao cap", "dang cap"],
        },
    ),
    (
        "budget",
        PatternSet {
            accented: &["rẻ", "giá thấp", "bình dân", "tiết kiệm", "sinh viên"],
            stripped: &["re", "gia thap", "binh dan", "tiet kiem", "sinh vien"],
        },
    ),
    (
        "outdoor",
        PatternSet {
            accented: &["ngoài trời", "sân vườn", "view đẹp"],
            stripped: &["ngoai troi", "san vuon", "view dep"],
        },
    ),
    (
        "indoor",
        PatternSet {
            accented: &["trong nhà", "máy lạnh", "điều hòa"],
            stripped: &["trong nha", "may lanh", "dieu hoa"],
        },
    ),
];

/// Target-audience tags; the highest pattern count wins, earlier row on ties.
pub const TARGETS: &[(&str, PatternSet)] = &[
    (
        "family",
        PatternSet {
            accented: &["gia đình", "cả nhà", "bố mẹ", "family"],
            stripped: &["gia dinh", "ca nha", "bo me"],
        },
    ),
    (
        "couple",
        PatternSet {
            accented: &["cặp đôi", "hai người", "người yêu", "hẹn hò", "couple"],
            stripped: &["cap doi", "hai nguoi", "nguoi yeu", "hen ho"],
        },
    ),
    (
        "kids",
        PatternSet {
            accented: &["trẻ em", "em bé", "bé yêu", "kids"],
            stripped: &["tre em", "em be", "be yeu"],
        },
    ),
    (
        "friends",
        PatternSet {
            accented: &["bạn bè", "hội bạn", "nhóm bạn"],
            stripped: &["ban be", "hoi ban", "nhom ban"],
        },
    ),
    (
        "business",
        PatternSet {
            accented: &["công việc", "doanh nghiệp", "đối tác", "khách hàng", "meeting"],
            stripped: &["cong viec", "doanh nghiep", "doi tac", "khach hang"],
        },
    ),
    (
        "solo",
        PatternSet {
            accented: &["một mình", "cá nhân", "solo"],
            stripped: &["mot minh", "ca nhan"],
        },
    ),
];

/// Price-preference cues, checked in bracket order; the first match wins.
pub const PRICES: &[(&str, PatternSet)] = &[
    (
        "budget",
        PatternSet {
            accented: &["rẻ", "giá rẻ", "bình dân", "tiết kiệm", "sinh viên", "budget"],
            stripped: &["re", "gia re", "binh dan", "tiet kiem", "sinh vien"],
        },
    ),
    (
        "mid-range",
        PatternSet {
            accented: &["tầm trung", "vừa phải", "trung bình", "vừa túi tiền"],
            stripped: &["tam trung", "vua phai", "trung binh", "vua tui tien"],
        },
    ),
    (
        "premium",
        PatternSet {
            accented: &["cao cấp", "sang trọng", "premium"],
            stripped: &["cao cap", "sang trong"],
        },
    ),
    (
        "luxury",
        PatternSet {
            accented: &["đẳng cấp", "xa xỉ", "5 sao", "luxury", "vip"],
            stripped: &["dang cap", "xa xi"],
        },
    ),
];

/// Cue words that introduce a location phrase.
pub const LOCATION_CUES: &[&str] = &["tại", "ở", "trong", "gần", "khu vực"];

/// Vietnamese and English stop words removed before keyword extraction.
pub const STOP_WORDS: &[&str] = &[
    "tôi", "tại", "ở", "trong", "có", "là", "và", "với", "cho", "của", "một",
    "các", "này", "đó", "được", "sẽ", "đã", "từ", "về", "như", "gần", "muốn",
    "tìm", "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for",
];
